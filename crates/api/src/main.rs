use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use domain::services::{
    ChangeFeed, DirectoryClient, GuestListSubscription, InMemoryDirectory, RefreshTrigger,
};
use persistence::PgDirectory;
use wedding_rsvp_api::app::{create_app, AppState};
use wedding_rsvp_api::config::{Config, DirectoryBackend};
use wedding_rsvp_api::middleware;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    middleware::logging::init_logging(&config.logging);
    middleware::init_metrics()?;

    info!("Starting Wedding RSVP API v{}", env!("CARGO_PKG_VERSION"));

    let (directory, feed) = connect_directory(&config).await?;

    let addr = config.socket_addr()?;
    let state = AppState::new(config, directory);

    match state.guest_list.refresh(RefreshTrigger::Startup).await {
        Ok(count) => info!(guests = count, "Guest list loaded"),
        Err(e) => warn!(error = %e, "Initial guest list load failed"),
    }

    let mut subscription = GuestListSubscription::new(state.guest_list.clone(), feed);
    subscription.start();

    middleware::spawn_rate_limit_pruning(state.rate_limiter.clone(), Duration::from_secs(60));

    let app = create_app(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    subscription.stop().await;
    info!("Server stopped");

    Ok(())
}

async fn connect_directory(
    config: &Config,
) -> Result<(Arc<dyn DirectoryClient>, Arc<dyn ChangeFeed>)> {
    match config.directory.backend {
        DirectoryBackend::Postgres => {
            let pool = persistence::db::create_pool(&config.database.pool_config()).await?;

            info!("Running database migrations...");
            persistence::db::run_migrations(&pool).await?;
            info!("Migrations completed");

            spawn_pool_metrics(pool.clone());

            let directory = PgDirectory::new(pool);
            Ok((Arc::new(directory.clone()), Arc::new(directory)))
        }
        DirectoryBackend::Memory => {
            warn!("Using in-memory guest directory; data is lost on restart");
            let directory = InMemoryDirectory::new();
            Ok((Arc::new(directory.clone()), Arc::new(directory)))
        }
    }
}

/// Publishes connection pool gauges every 15 seconds.
fn spawn_pool_metrics(pool: sqlx::PgPool) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(15));
        loop {
            interval.tick().await;
            persistence::metrics::record_pool_metrics(&pool);
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
