//! # Gymgate Worker
//!
//! Long-running binary that triggers the auto-checkout reconciliation
//! sweep once a day: open attendance sessions from before the end of
//! yesterday are closed at that cutoff and flagged `auto_checkout`.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/gymgate cargo run -p gymgate-worker
//! ```

use gymgate_shared::db::migrations::run_migrations;
use gymgate_shared::db::pool::{create_pool, DatabaseConfig};
use gymgate_worker::config::Config;
use gymgate_worker::sweeper::{Sweeper, SweeperConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gymgate_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Gymgate Worker v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig {
        url: config.database_url.clone(),
        max_connections: config.max_connections,
        ..Default::default()
    })
    .await?;

    run_migrations(&pool).await?;

    let sweeper = Sweeper::with_config(
        pool,
        SweeperConfig {
            run_time: config.run_time,
            run_on_start: config.run_on_start,
        },
    );
    let shutdown = sweeper.shutdown_token();

    let handle = tokio::spawn(async move { sweeper.run().await });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping sweeper...");
    shutdown.cancel();

    handle.await??;
    tracing::info!("Shutdown complete");

    Ok(())
}
