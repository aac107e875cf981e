//! Marketfeed Backend Server
//!
//! Real-time market data server: multi-provider quote pipeline, in-memory
//! price cache, WebSocket fan-out and optional PostgreSQL persistence.

use marketfeed_backend::api::create_router;
use marketfeed_backend::config::Config;
use marketfeed_backend::db::{DatabasePool, PgSymbolStore, SymbolStore};
use marketfeed_backend::state::AppState;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from file and environment overrides
    let config = Config::load_or_default()?;

    // Connect the optional database; a failed connection degrades to
    // cache-only instead of taking the feed down with it
    let store: Option<Arc<dyn SymbolStore>> = match DatabasePool::connect(&config.database).await {
        Ok(Some(db)) => {
            db.run_migrations().await?;
            Some(Arc::new(PgSymbolStore::new(db.pool().clone())))
        }
        Ok(None) => None,
        Err(e) => {
            error!("Database connection failed, running cache-only: {}", e);
            None
        }
    };

    let host = config.server.host.clone();
    let port = config.server.port;

    // Create application state
    let state = Arc::new(AppState::from_config(config, store)?);

    info!("Starting Marketfeed Backend on {}:{}", host, port);

    // Start the background refresh and maintenance loops
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(Arc::clone(&state.engine).run_refresh_loop(shutdown_rx.clone()));
    tokio::spawn(Arc::clone(&state.engine).run_maintenance_loop(shutdown_rx));

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the router
    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start the server
    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received, stopping background loops");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    Ok(())
}
