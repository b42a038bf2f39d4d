//! Taskdeck library
//!
//! This module exports the core components for testing and integration.

pub mod cache;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod events;
pub mod forms;
pub mod logging;
pub mod services;
pub mod types;
