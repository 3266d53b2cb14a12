//! `GET /api/qr` and `GET /api/verify`.

use super::{now_millis, AppState};
use crate::error::{ServiceError, TokenError};
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Query of `GET /api/qr`.
#[derive(Debug, Deserialize)]
pub struct IssueQuery {
    enrollment: Option<String>,
}

/// Body of a successful issuance.
#[derive(Debug, Serialize)]
pub struct IssueResponse {
    token: String,
}

/// Issue a check-in token for `enrollment`.
pub async fn issue(
    State(state): State<AppState>,
    Query(query): Query<IssueQuery>,
) -> Result<Json<IssueResponse>, ServiceError> {
    let enrollment = query
        .enrollment
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ServiceError::bad_request("Missing enrollment parameter"))?;

    let token = state.tokens.issue(enrollment, now_millis())?;
    info!(identifier = %enrollment, "Issued check-in token");
    Ok(Json(IssueResponse { token }))
}

/// Query of `GET /api/verify`.
#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    token: Option<String>,
}

/// Body of a successful verification.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    ok: bool,
    enrollment: String,
    issued_at_millis: i64,
    verified_at_millis: i64,
}

/// Verify a token without touching the ledger.
pub async fn verify(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Result<Json<VerifyResponse>, ServiceError> {
    let token = query.token.unwrap_or_default();
    let verified = state
        .tokens
        .verify(token.trim(), now_millis())
        .map_err(|e: TokenError| {
            debug!(reason = e.kind(), "Token verification failed");
            e
        })?;

    Ok(Json(VerifyResponse {
        ok: true,
        enrollment: verified.identifier,
        issued_at_millis: verified.issued_at_millis,
        verified_at_millis: verified.verified_at_millis,
    }))
}
