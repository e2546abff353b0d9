use std::sync::Arc;

use price_history_backend::config::Config;
use price_history_backend::jobs::price_history_sync::start_price_history_sync_job;
use price_history_backend::services::price_feed::YahooFinanceFeed;
use price_history_backend::services::price_reconciler::PriceReconciler;
use price_history_backend::services::price_store::PriceStore;
use price_history_backend::{AppState, build_router};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,price_history_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    // Connect to database
    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url).await?;

    // Run migrations
    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None).await?;

    let feed = Arc::new(YahooFinanceFeed::new(&config.feed));
    let reconciler = PriceReconciler::new(
        feed,
        PriceStore::new(db.clone()),
        config.sync.asset.clone(),
        config.sync.history_start,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sync_job = start_price_history_sync_job(reconciler, config.sync.clone(), shutdown_rx);

    let app = build_router(AppState::new(db.clone()));

    // Start server
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped, shutting down background jobs");
    let _ = shutdown_tx.send(true);
    if let Err(e) = sync_job.await {
        tracing::error!("Price history sync job ended abnormally: {}", e);
    }

    db.close().await?;
    tracing::info!("Database connection closed");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
