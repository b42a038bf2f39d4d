//! CLI command definitions for taskdeck
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use clap::{Parser, Subcommand};
use serde_json::{Map, Value, json};

/// Task and category manager with a web UI and JSON API
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Interface to bind (overrides config)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Port to bind (overrides config)
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start the HTTP server (default if no subcommand given)
    Serve,

    /// Print task and category statistics as JSON
    Stats,

    /// Create or upgrade the database schema and exit
    Migrate,
}

impl Cli {
    /// Subcommand to run, defaulting to `serve`.
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Serve)
    }

    /// Config overlay built from the flags that were given.
    pub fn config_overrides(&self) -> Value {
        let mut server = Map::new();
        if let Some(db) = &self.database {
            server.insert("db_path".into(), json!(db));
        }
        if let Some(host) = &self.host {
            server.insert("host".into(), json!(host));
        }
        if let Some(port) = self.port {
            server.insert("port".into(), json!(port));
        }
        json!({ "server": server })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_serve() {
        let cli = Cli::parse_from(["taskdeck"]);
        assert_eq!(cli.command(), Command::Serve);
        assert_eq!(cli.log, "2");
        assert_eq!(cli.config_overrides(), json!({"server": {}}));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["taskdeck", "stats", "--database", "x.db", "--port", "9001"]);
        assert_eq!(cli.command(), Command::Stats);
        assert_eq!(
            cli.config_overrides(),
            json!({"server": {"db_path": "x.db", "port": 9001}})
        );
    }
}
