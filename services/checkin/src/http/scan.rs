use super::{now_millis, AppState};
use crate::error::ServiceError;
use crate::scan::{ScanReport, DEFAULT_STATION};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;

/// Body of `POST /api/scan`.
#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    text: String,
    #[serde(default)]
    station: Option<String>,
}

/// `POST /api/scan`: apply one scanned code.
pub async fn scan(
    State(state): State<AppState>,
    body: Result<Json<ScanRequest>, JsonRejection>,
) -> Result<Json<ScanReport>, ServiceError> {
    let Json(request) = body.map_err(|_| ServiceError::bad_request("Expected JSON body with \"text\""))?;
    if request.text.trim().is_empty() {
        return Err(ServiceError::bad_request("Missing scan text"));
    }
    let station = request
        .station
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_STATION);

    let report = state.scanner.scan(&request.text, station, now_millis()).await?;
    Ok(Json(report))
}
