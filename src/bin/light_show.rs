// bin/light_show.rs
use hue_gateway::{
    config::Settings,
    control::LightControl,
    events::EventBus,
    show::{GatewayClient, Orchestrator, ShowPlan},
    utils,
};
use std::{sync::Arc, time::Duration};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::init_tracing();

    let settings = Settings::new()
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    let show = settings.show;

    let plan = ShowPlan::assign(&show.lights)?;
    let client: Arc<dyn LightControl> = Arc::new(GatewayClient::new(&show.gateway_url)?);

    let orchestrator = Orchestrator::new(client, Arc::new(EventBus::new()))
        .with_baseline_brightness(show.baseline_brightness)
        .with_worker_timeout(show.worker_timeout_secs.map(Duration::from_secs))
        .with_finale(show.finale);

    let report = orchestrator.run(plan).await?;
    for worker in &report.workers {
        info!(light = %worker.light, outcome = ?worker.outcome, "Worker finished");
    }
    info!(
        run_id = %report.run_id,
        primed = report.primed,
        finalized = report.finalized,
        "Show complete"
    );

    Ok(())
}
