use ::metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus HTTP exporter on the given port.
/// After this call, any metrics recorded via the `metrics` crate
/// macros (counter!, histogram!) are exported at /metrics.
/// Without an installed recorder the macros below are no-ops.
pub fn init_metrics_server(port: u16) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()?;
    Ok(())
}

// ── Fetch metrics ────────────────────────────────────────────────

/// `endpoint` label values shared by every fetch series.
pub const MARKET_ENDPOINT: &str = "market";
pub const HISTORICAL_ENDPOINT: &str = "historical";

pub fn record_fetch_issued(endpoint: &'static str) {
    counter!("fetch_requests_total", "endpoint" => endpoint).increment(1);
}

pub fn record_fetch_outcome(endpoint: &'static str, outcome: &'static str) {
    counter!("fetch_outcomes_total", "endpoint" => endpoint, "outcome" => outcome).increment(1);
}

pub fn record_fetch_latency_ms(endpoint: &'static str, latency_ms: f64) {
    histogram!("fetch_latency_ms", "endpoint" => endpoint).record(latency_ms);
}

/// A response that arrived after a newer request was issued.
pub fn record_stale_discard(component: &'static str) {
    counter!("fetch_stale_discards_total", "component" => component).increment(1);
}

// ── Chart metrics ────────────────────────────────────────────────

pub fn record_chart_created() {
    counter!("chart_instances_created_total").increment(1);
}

pub fn record_chart_disposed() {
    counter!("chart_instances_disposed_total").increment(1);
}
