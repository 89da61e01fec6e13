use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use betpool_bot::config::{Config, FixturesSource};
use betpool_bot::dashboard::{self, AppState};
use betpool_bot::db::Database;
use betpool_bot::pool::PoolEngine;
use betpool_bot::tournament::{ApiFootball, FileSource, FixtureSource};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;
    info!(
        "Scoring: {:?}, decided draws count {:?} goals",
        config.score_mode, config.extra_score_mode
    );

    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);

    let source: Arc<dyn FixtureSource> = match config.fixtures_source {
        FixturesSource::File => Arc::new(FileSource::new(&config.fixtures_file)),
        FixturesSource::ApiFootball => Arc::new(ApiFootball::new(
            &config.api_football_url,
            config.api_token.as_deref().unwrap_or_default(),
            config.league_id,
        )?),
    };
    info!("Fixture source: {}", source.name());

    let engine = Arc::new(
        PoolEngine::start(config.pool_settings()?, config.policy(), db, source).await?,
    );

    let app = dashboard::router(AppState {
        engine: engine.clone(),
    });
    let addr: SocketAddr = config.dashboard_addr.parse()?;
    info!("Dashboard listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let update_interval = Duration::from_secs(config.update_interval_secs);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(update_interval);
        loop {
            interval.tick().await;
            match engine.run_update(Utc::now()).await {
                Ok(report) if !report.is_empty() => match serde_json::to_string(&report) {
                    Ok(json) => info!("Update report: {}", json),
                    Err(e) => error!("Failed to serialize update report: {}", e),
                },
                Ok(_) => {}
                Err(e) => error!("Update failed: {:#}", e),
            }
        }
    });

    // Run dashboard server (blocks until shutdown)
    axum::serve(listener, app).await?;

    Ok(())
}
