//! HTTP surface.

pub mod health;
pub mod members;
pub mod scan;
pub mod tokens;
pub mod verifications;

use crate::config::Config;
use crate::error::{RosterError, ServiceError};
use crate::ledger::{Ledger, LedgerStore};
use crate::metrics;
use crate::roster::{Roster, RosterSource};
use crate::scan::{ScanDebouncer, Scanner};
use crate::token::TokenService;
use axum::extract::{MatchedPath, Request};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Header carrying the admin secret.
pub const ADMIN_HEADER: &str = "x-admin-secret";

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration
    pub config: Arc<Config>,
    /// Token issuance and verification
    pub tokens: Arc<TokenService>,
    /// In-process roster snapshot
    pub roster: Arc<Roster>,
    /// Where the roster is persisted
    pub roster_source: Arc<dyn RosterSource>,
    /// Verification ledger
    pub ledger: Arc<Ledger>,
    /// Scan pipeline
    pub scanner: Arc<Scanner>,
}

impl AppState {
    /// Wire the services together. The roster starts empty; call
    /// [`AppState::load_roster`] to fill it.
    #[must_use]
    pub fn new(
        config: Config,
        roster_source: Arc<dyn RosterSource>,
        ledger_store: Arc<dyn LedgerStore>,
    ) -> Self {
        let tokens = Arc::new(TokenService::new(
            config.signing_key.as_ref(),
            config.token_max_age,
        ));
        let roster = Arc::new(Roster::new());
        let ledger = Arc::new(Ledger::new(ledger_store));
        let scanner = Arc::new(Scanner::new(
            Arc::clone(&tokens),
            Arc::clone(&roster),
            Arc::clone(&ledger),
            ScanDebouncer::new(config.scan_min_interval, config.scan_repeat_window),
        ));

        Self {
            config: Arc::new(config),
            tokens,
            roster,
            roster_source,
            ledger,
            scanner,
        }
    }

    /// Replace the snapshot with whatever the roster source holds.
    ///
    /// # Errors
    ///
    /// Source failures and duplicate identifiers in stored data.
    pub async fn load_roster(&self) -> Result<usize, RosterError> {
        let entries = self.roster_source.load().await?;
        let count = self.roster.install(entries)?;
        info!(
            count,
            source = self.roster_source.name(),
            degraded = self.roster_source.is_degraded(),
            "Roster loaded"
        );
        Ok(count)
    }

    /// Check the admin header. Open when no admin secret is configured.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Unauthorized`] on a missing or wrong secret.
    pub fn require_admin(&self, headers: &HeaderMap) -> Result<(), ServiceError> {
        let Some(secret) = &self.config.admin_secret else {
            return Ok(());
        };
        let provided = headers
            .get(ADMIN_HEADER)
            .map(HeaderValue::as_bytes)
            .unwrap_or_default();
        if secret.matches(provided) {
            Ok(())
        } else {
            warn!("Rejected admin request with missing or wrong secret");
            Err(ServiceError::Unauthorized)
        }
    }
}

/// Build the router.
pub fn create_app(state: AppState) -> Router {
    let timeout = state.config.request_timeout;

    Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(health::prometheus_metrics))
        .route("/api/qr", get(tokens::issue))
        .route("/api/verify", get(tokens::verify))
        .route("/api/scan", post(scan::scan))
        .route(
            "/api/members",
            get(members::list).post(members::replace).delete(members::clear),
        )
        .route(
            "/api/verifications",
            get(verifications::history).delete(verifications::clear),
        )
        .route("/api/verifications/export", get(verifications::export))
        .route_layer(middleware::from_fn(track_latency))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::map_response(no_store))
        .with_state(state)
}

/// Current wall-clock time in epoch milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

async fn no_store(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate, proxy-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    headers.insert(
        HeaderName::from_static("surrogate-control"),
        HeaderValue::from_static("no-store"),
    );
    response
}

async fn track_latency(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| "unmatched".to_string(), |p| p.as_str().to_string());
    let start = Instant::now();
    let response = next.run(request).await;
    metrics::record_http_latency(&route, start.elapsed().as_secs_f64());
    response
}
