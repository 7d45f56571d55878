use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use tracing::{Level, info};

use server::config::AppConfig;
use server::registry::ServiceRegistry;
use server::state::AppState;
use server::store::BlobEngine;
use server::{build_router, database};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load()?;
    let db = database::init_db(&config.database).await?;
    let engine = Arc::new(BlobEngine::new(
        db.clone(),
        config.storage.allowed_types.clone(),
    ));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let mut registry = ServiceRegistry::from_config(&config.registry, config.server.port);
    if let Some(registry) = registry.as_mut() {
        registry.start();
    }

    let state = AppState {
        db,
        engine,
        config,
        started_at: Instant::now(),
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server running at http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(registry) = registry.take() {
        registry.stop().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
