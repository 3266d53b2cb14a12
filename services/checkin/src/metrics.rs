//! Prometheus metrics for the check-in service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_histogram_vec, Counter, CounterVec,
    Encoder, HistogramVec, TextEncoder,
};

/// Tokens issued counter.
pub static TOKENS_ISSUED: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "checkin_tokens_issued_total",
        "Total number of check-in tokens issued"
    )
    .expect("Failed to register tokens_issued metric")
});

/// Token verifications counter.
pub static TOKEN_VERIFICATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "checkin_token_verifications_total",
        "Total number of check-in token verifications",
        &["result"]
    )
    .expect("Failed to register token_verifications metric")
});

/// Scan outcomes counter.
pub static SCANS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "checkin_scans_total",
        "Total number of scans by outcome",
        &["outcome"]
    )
    .expect("Failed to register scans metric")
});

/// Roster loads counter.
pub static ROSTER_LOADS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "checkin_roster_loads_total",
        "Total number of roster loads by source",
        &["source", "status"]
    )
    .expect("Failed to register roster_loads metric")
});

/// HTTP request latency histogram.
pub static HTTP_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "checkin_http_latency_seconds",
        "HTTP request latency in seconds",
        &["route"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("Failed to register http_latency metric")
});

/// Record a token issuance.
pub fn record_token_issued() {
    TOKENS_ISSUED.inc();
}

/// Record a token verification result (`valid` or an error kind).
pub fn record_token_verification(result: &str) {
    TOKEN_VERIFICATIONS.with_label_values(&[result]).inc();
}

/// Record a scan outcome.
pub fn record_scan(outcome: &str) {
    SCANS.with_label_values(&[outcome]).inc();
}

/// Record a roster load attempt.
pub fn record_roster_load(source: &str, status: &str) {
    ROSTER_LOADS.with_label_values(&[source, status]).inc();
}

/// Record HTTP request latency.
pub fn record_http_latency(route: &str, duration_secs: f64) {
    HTTP_LATENCY.with_label_values(&[route]).observe(duration_secs);
}

/// Render every registered metric in the text exposition format.
#[must_use]
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8(buffer).unwrap_or_default()
}
