// main.rs
use hue_gateway::{
    bridge::HueBridge, config::Settings, gateway::Gateway, handlers, metrics, models::AppState,
    utils,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::init_tracing();

    let settings = Settings::new()
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    if settings.metrics.enabled {
        metrics::setup_metrics(settings.metrics.port)?;
    }

    let bridge = HueBridge::new(&settings.bridge)
        .map_err(|e| anyhow::anyhow!("Failed to build bridge client: {}", e))?;
    let state = Arc::new(AppState::new(
        Gateway::new(Arc::new(bridge)),
        settings.midi.clone(),
    ));

    let app = handlers::router(state);

    let listener = tokio::net::TcpListener::bind(&settings.server.address)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind address: {}", e))?;

    tracing::info!(bridge = %settings.bridge.host, "Server started on {}", settings.server.address);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
