//! hairswap - Hair-Swap Orchestration Service
//!
//! Accepts a request naming three source images and returns the public URL
//! of the composited result. Image transformation and artifact hosting are
//! delegated to external backends over HTTP.

use anyhow::Result;
use tracing::info;

use hairswap::{build_router, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting hairswap v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = Config::load()?;
    info!("Inference backend: {}", config.inference_base_url);
    info!("Storage backend: {}", config.storage_upload_url);
    if config.memory_limit_bytes > 0 {
        info!("Memory watchdog limit: {} bytes", config.memory_limit_bytes);
    }

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("hairswap listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
