//! Roster import, listing and reset.

use super::AppState;
use crate::error::ServiceError;
use crate::roster::{prepare_entries, RosterEntry};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Roster listing.
#[derive(Debug, Serialize)]
pub struct MembersResponse {
    members: Vec<RosterEntry>,
}

/// Roster import body.
#[derive(Debug, Deserialize)]
pub struct ReplaceRequest {
    members: Vec<RosterEntry>,
}

/// Roster import result.
#[derive(Debug, Serialize)]
pub struct ReplaceResponse {
    message: &'static str,
    count: usize,
}

/// Plain acknowledgement.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub(crate) message: &'static str,
}

/// `GET /api/members`
pub async fn list(State(state): State<AppState>) -> Json<MembersResponse> {
    Json(MembersResponse {
        members: state.roster.entries(),
    })
}

/// `POST /api/members`: replace the roster.
///
/// Entries are validated as a whole, then persisted, then swapped into the
/// snapshot. A failure at any step leaves the current roster in place.
pub async fn replace(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ReplaceRequest>, JsonRejection>,
) -> Result<Json<ReplaceResponse>, ServiceError> {
    state.require_admin(&headers)?;
    let Json(request) = body.map_err(|_| {
        ServiceError::bad_request("Invalid data format. \"members\" should be an array.")
    })?;

    let entries = prepare_entries(request.members, &state.config.event_name)?;
    state.roster_source.store(&entries).await?;
    let count = state.roster.install(entries)?;

    info!(count, "Roster replaced");
    Ok(Json(ReplaceResponse {
        message: "Data saved successfully.",
        count,
    }))
}

/// `DELETE /api/members`: remove every roster entry.
pub async fn clear(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ServiceError> {
    state.require_admin(&headers)?;
    state.roster_source.clear().await?;
    state.roster.clear();

    info!("Roster cleared");
    Ok(Json(MessageResponse {
        message: "All data cleared.",
    }))
}
