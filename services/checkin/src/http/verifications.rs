//! Ledger history, export and reset.

use super::members::MessageResponse;
use super::AppState;
use crate::error::ServiceError;
use crate::export::{export_rows, ExportRow, UNKNOWN_NAME};
use crate::identifier::NormalizedId;
use crate::roster::RosterLookup;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

/// One history row.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationView {
    enrollment_number: String,
    name: String,
    verified_at_millis: i64,
}

/// Ledger history.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    verifications: Vec<VerificationView>,
}

/// Export rows.
#[derive(Debug, Serialize)]
pub struct ExportResponse {
    rows: Vec<ExportRow>,
}

/// `GET /api/verifications`: most recent first.
pub async fn history(State(state): State<AppState>) -> Result<Json<HistoryResponse>, ServiceError> {
    let verifications = state
        .ledger
        .history()
        .await?
        .into_iter()
        .map(|record| {
            let name = state
                .roster
                .lookup(&NormalizedId::new(&record.identifier))
                .map_or_else(|| UNKNOWN_NAME.to_string(), |entry| entry.name);
            VerificationView {
                enrollment_number: record.identifier,
                name,
                verified_at_millis: record.verified_at_millis,
            }
        })
        .collect();
    Ok(Json(HistoryResponse { verifications }))
}

/// `GET /api/verifications/export`
pub async fn export(State(state): State<AppState>) -> Result<Json<ExportResponse>, ServiceError> {
    let history = state.ledger.history().await?;
    Ok(Json(ExportResponse {
        rows: export_rows(&history, state.roster.as_ref()),
    }))
}

/// `DELETE /api/verifications`: operator reset.
pub async fn clear(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.require_admin(&headers)?;
    state.ledger.clear().await?;
    state.scanner.reset();
    Ok(Json(MessageResponse {
        message: "All verifications cleared.",
    }))
}
