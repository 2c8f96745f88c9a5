use anyhow::Result;
use engine::scheduler::CycleScheduler;
use migration::{Migrator, MigratorTrait};
use shared::config::{Config, LogFormat};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

mod services;
mod state;

use state::AppState;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    tracing::info!(
        pairs = ?config.trading.pairs,
        frequencies = ?config.trading.frequencies,
        strategies = ?config.trading.strategies,
        "Starting trader..."
    );

    let app_state = AppState::new(config).await?;
    Migrator::up(app_state.db.as_ref(), None).await?;
    tracing::info!("Migrations applied");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Could not listen for Ctrl-C: {}", err);
            return;
        }
        tracing::info!("Shutdown requested, finishing in-flight cycles");
        let _ = shutdown_tx.send(true);
    });

    let scheduler = CycleScheduler::new(app_state.context.clone());
    scheduler.run(shutdown_rx).await?;

    tracing::info!("Trader stopped");
    Ok(())
}
