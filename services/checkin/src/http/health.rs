use super::AppState;
use crate::metrics;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

/// Health report.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: &'static str,
    degraded: bool,
    signing: bool,
    roster_size: usize,
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let degraded = state.roster_source.is_degraded();
    Json(HealthResponse {
        status: if degraded { "degraded" } else { "healthy" },
        degraded,
        signing: state.tokens.is_configured(),
        roster_size: state.roster.len(),
    })
}

/// `GET /metrics`
pub async fn prometheus_metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render(),
    )
}
