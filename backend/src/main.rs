//! Portfolio Backend
//!
//! REST API for the portfolio site: blog posts, page-view analytics, media
//! links and uploads, and user sign-out.

use chrono::Utc;
use portfolio_backend::config::Config;
use portfolio_backend::db::Database;
use portfolio_backend::routes;
use portfolio_backend::state::AppState;
use portfolio_backend::storage::MediaStore;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{error, info, warn};

/// Periodically delete analytics events past their expiry
fn spawn_event_purge(db: Database, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match db.purge_expired_events(Utc::now().timestamp()).await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "Purged expired analytics events"),
                Err(e) => warn!(error = %e, "Failed to purge analytics events"),
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env();
    info!("Configuration loaded: {:?}", config);

    let db = Database::new(&config.database.path).await?;
    let media = MediaStore::from_config(&config)?;
    if media.is_none() {
        warn!("MEDIA_BUCKET not set, media endpoints are disabled");
    }

    spawn_event_purge(
        db.clone(),
        Duration::from_secs(config.analytics.purge_interval_secs),
    );

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {}", e))?;

    let app = routes::router(AppState::new(db, media, config));

    info!("🚀 Server running on http://{}", addr);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    // Setup graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Handle graceful shutdown signals (Ctrl+C, SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}
