//! Taskdeck server
//!
//! Task and category manager served as HTML pages and a JSON API.

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use std::sync::Arc;
use taskdeck::cache::{CategoryStatsCache, MemoryCache};
use taskdeck::cli::{Cli, Command};
use taskdeck::config::{Config, ConfigLoader, ConfigPaths};
use taskdeck::dashboard::{self, DashboardServer};
use taskdeck::db::Database;
use taskdeck::logging;
use taskdeck::services::Services;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log, cli.verbose)?;

    let mut paths = ConfigPaths::discover();
    if let Some(config_path) = &cli.config {
        paths = paths.with_explicit_file(config_path.into());
    }
    let loader = ConfigLoader::load_with_paths(paths)?;
    if let Some(path) = loader.config_path() {
        info!("Loaded configuration from {}", path.display());
    }
    let config = loader.config().merged_with(cli.config_overrides())?;

    match cli.command() {
        Command::Migrate => run_migrate(&config),
        Command::Stats => run_stats(&config),
        Command::Serve => run_server(config).await,
    }
}

fn open_database(config: &Config) -> Result<Arc<Database>> {
    config.ensure_db_dir()?;
    let db = Database::open(&config.server.db_path).with_context(|| {
        format!(
            "Failed to open database {}",
            config.server.db_path.display()
        )
    })?;
    Ok(Arc::new(db))
}

fn build_services(config: &Config, db: Arc<Database>) -> Services {
    let stats_cache = Arc::new(CategoryStatsCache::new(
        Arc::new(MemoryCache::new()),
        config.cache.stats_ttl(),
    ));
    Services::new(db, stats_cache)
}

fn run_migrate(config: &Config) -> Result<()> {
    open_database(config)?;
    println!("Database ready at {}", config.server.db_path.display());
    Ok(())
}

fn run_stats(config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let services = build_services(config, db);
    let tasks = services.task_queries.get_task_statistics()?;
    let categories = services.categories.statistics()?;
    let report = json!({
        "tasks": tasks,
        "categories": categories,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn run_server(config: Config) -> Result<()> {
    let db = open_database(&config)?;
    info!("Using database {}", config.server.db_path.display());

    let services = build_services(&config, db);
    let state = DashboardServer::new(services, config.server.page_size);

    let (shutdown_tx, addr, handle) = dashboard::start_server(state, &config.bind_addr()).await?;
    info!("Taskdeck available at http://{}", addr);

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl-C, shutting down");
    let _ = shutdown_tx.send(());
    handle.await?;
    Ok(())
}
