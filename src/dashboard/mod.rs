//! Web layer: HTML pages, the JSON API and the HTTP server.

mod api;
mod pages;
mod server;
pub mod templates;
pub mod views;

pub use api::status_for;
pub use server::{DashboardServer, build_router, start_server};
