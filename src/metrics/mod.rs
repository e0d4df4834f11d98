// metrics/mod.rs
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

pub fn setup_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to setup metrics: {}", e))
}

pub fn record_bridge_call(operation: &'static str, outcome: &'static str) {
    metrics::counter!("gateway_bridge_calls_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
}

pub fn record_show_worker(outcome: &'static str) {
    metrics::counter!("show_workers_total", "outcome" => outcome).increment(1);
}
