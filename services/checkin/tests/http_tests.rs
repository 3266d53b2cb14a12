//! HTTP integration tests against the router, no network.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use checkin_service::config::Config;
use checkin_service::ledger::MemoryLedgerStore;
use checkin_service::roster::FileRosterSource;
use checkin_service::token::SigningKey;
use checkin_service::{create_app, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const ADMIN: &str = "admin-pass";

struct TestApp {
    app: Router,
    state: AppState,
    _dir: TempDir,
}

fn test_app(signing: Option<&str>, admin: Option<&str>) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        signing_key: signing.and_then(|s| SigningKey::from_secret(s.as_bytes())),
        admin_secret: admin.and_then(|s| SigningKey::from_secret(s.as_bytes())),
        roster_cache_path: dir.path().join("members.json"),
        scan_min_interval: std::time::Duration::ZERO,
        scan_repeat_window: std::time::Duration::ZERO,
        ..Config::default()
    };
    let state = AppState::new(
        config,
        Arc::new(FileRosterSource::new(dir.path().join("members.json"))),
        Arc::new(MemoryLedgerStore::new()),
    );
    TestApp {
        app: create_app(state.clone()),
        state,
        _dir: dir,
    }
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>, admin: Option<&str>) -> (StatusCode, axum::http::HeaderMap, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(secret) = admin {
        builder = builder.header("x-admin-secret", secret);
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, value)
}

async fn import_roster(app: &Router) {
    let members = json!({ "members": [
        { "name": "Ada Lovelace", "enrollmentNumber": "TC-2025-001", "program": "CS", "gmail": "ada@example.com", "teamName": "Engines" },
        { "name": "Bob", "enrollmentNumber": "TC-2025-002", "program": "EE", "gmail": "bob@example.com" }
    ]});
    let (status, _, body) = send(app, Method::POST, "/api/members", Some(members), Some(ADMIN)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn test_every_response_is_no_store() {
    let t = test_app(Some("k"), None);
    for uri in ["/health", "/api/qr", "/does-not-exist"] {
        let (_, headers, _) = send(&t.app, Method::GET, uri, None, None).await;
        assert_eq!(headers[header::CACHE_CONTROL], "no-store, no-cache, must-revalidate, proxy-revalidate", "{uri}");
        assert_eq!(headers[header::PRAGMA], "no-cache");
        assert_eq!(headers[header::EXPIRES], "0");
        assert_eq!(headers["surrogate-control"], "no-store");
    }
}

#[tokio::test]
async fn test_health_reports_signing() {
    let t = test_app(None, None);
    let (status, _, body) = send(&t.app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["signing"], false);
    assert_eq!(body["degraded"], false);
}

#[tokio::test]
async fn test_issue_requires_enrollment() {
    let t = test_app(Some("k"), None);
    for uri in ["/api/qr", "/api/qr?enrollment=", "/api/qr?enrollment=%20%20"] {
        let (status, _, body) = send(&t.app, Method::GET, uri, None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["code"], "MISSING_PARAMETER");
        assert!(body["correlationId"].is_string());
    }
}

#[tokio::test]
async fn test_unconfigured_signing_is_503() {
    let t = test_app(None, None);
    let (status, _, body) = send(&t.app, Method::GET, "/api/qr?enrollment=TC-1", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Signing not configured");

    let (status, _, _) = send(&t.app, Method::GET, "/api/verify?token=a.b", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_issue_then_verify() {
    let t = test_app(Some("s3cret"), None);
    let (status, _, body) = send(&t.app, Method::GET, "/api/qr?enrollment=TC-2025-001", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, _, body) = send(&t.app, Method::GET, &format!("/api/verify?token={token}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["enrollment"], "TC-2025-001");
}

#[tokio::test]
async fn test_verify_errors() {
    let t = test_app(Some("s3cret"), None);
    let (status, _, body) = send(&t.app, Method::GET, "/api/verify", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "TOKEN_INVALID");

    let other = test_app(Some("other"), None);
    let (_, _, body) = send(&other.app, Method::GET, "/api/qr?enrollment=TC-1", None, None).await;
    let foreign = body["token"].as_str().unwrap().to_string();

    let (status, _, body) = send(&t.app, Method::GET, &format!("/api/verify?token={foreign}"), None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Signature mismatch");
}

#[tokio::test]
async fn test_admin_routes_require_secret() {
    let t = test_app(Some("k"), Some(ADMIN));
    let body = json!({ "members": [] });

    let (status, _, _) = send(&t.app, Method::POST, "/api/members", Some(body.clone()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _, _) = send(&t.app, Method::POST, "/api/members", Some(body), Some("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _, _) = send(&t.app, Method::DELETE, "/api/verifications", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_import_rejects_bad_shape_and_duplicates() {
    let t = test_app(Some("k"), Some(ADMIN));
    import_roster(&t.app).await;

    let (status, _, body) = send(&t.app, Method::POST, "/api/members", Some(json!({ "members": "nope" })), Some(ADMIN)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid data format. \"members\" should be an array.");

    let dupes = json!({ "members": [
        { "name": "A", "enrollmentNumber": "x-1" },
        { "name": "B", "enrollmentNumber": "X-1" }
    ]});
    let (status, _, body) = send(&t.app, Method::POST, "/api/members", Some(dupes), Some(ADMIN)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "ROSTER_INVALID");
    assert_eq!(t.state.roster.len(), 2);
}

#[tokio::test]
async fn test_import_persists_to_source() {
    let t = test_app(Some("k"), Some(ADMIN));
    import_roster(&t.app).await;

    let (_, _, body) = send(&t.app, Method::GET, "/api/members", None, None).await;
    assert_eq!(body["members"][0]["eventName"], "Glitch 1.0");

    t.state.roster.clear();
    assert_eq!(t.state.load_roster().await.unwrap(), 2);
}

#[tokio::test]
async fn test_scan_flow() {
    let t = test_app(Some("s3cret"), Some(ADMIN));
    import_roster(&t.app).await;

    let (_, _, body) = send(&t.app, Method::GET, "/api/qr?enrollment=tc-2025-001", None, None).await;
    let token = body["token"].as_str().unwrap().to_string();

    let (status, _, first) = send(&t.app, Method::POST, "/api/scan", Some(json!({ "text": token })), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["status"], "verified");
    assert_eq!(first["message"], "Verification Successful!");
    assert_eq!(first["identifier"], "TC-2025-001");
    assert_eq!(first["member"]["name"], "Ada Lovelace");

    let (_, _, again) = send(&t.app, Method::POST, "/api/scan", Some(json!({ "text": token, "station": "north" })), None).await;
    assert_eq!(again["status"], "already_verified");
    assert_eq!(again["verifiedAtMillis"], first["verifiedAtMillis"]);

    let (_, _, unknown) = send(&t.app, Method::POST, "/api/scan", Some(json!({ "text": "TC-9999-000" })), None).await;
    assert_eq!(unknown["status"], "not_found");

    let (_, _, forged) = send(&t.app, Method::POST, "/api/scan", Some(json!({ "text": "abc.def" })), None).await;
    assert_eq!(forged["status"], "rejected");
    assert_eq!(forged["reason"], "signature_mismatch");

    let (status, _, _) = send(&t.app, Method::POST, "/api/scan", Some(json!({ "text": "   " })), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_history_export_and_reset() {
    let t = test_app(None, Some(ADMIN));
    import_roster(&t.app).await;

    send(&t.app, Method::POST, "/api/scan", Some(json!({ "text": "TC-2025-002" })), None).await;
    send(&t.app, Method::POST, "/api/scan", Some(json!({ "text": "TC-2025-001" })), None).await;

    let (_, _, history) = send(&t.app, Method::GET, "/api/verifications", None, None).await;
    let rows = history["verifications"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows[0]["verifiedAtMillis"].as_i64() >= rows[1]["verifiedAtMillis"].as_i64());

    let (_, _, export) = send(&t.app, Method::GET, "/api/verifications/export", None, None).await;
    let rows = export["rows"].as_array().unwrap();
    let ada = rows.iter().find(|r| r["enrollmentNumber"] == "TC-2025-001").unwrap();
    assert_eq!(ada["teamName"], "Engines");
    let bob = rows.iter().find(|r| r["enrollmentNumber"] == "TC-2025-002").unwrap();
    assert_eq!(bob["teamName"], "N/A");

    let (status, _, _) = send(&t.app, Method::DELETE, "/api/verifications", None, Some(ADMIN)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, _, history) = send(&t.app, Method::GET, "/api/verifications", None, None).await;
    assert!(history["verifications"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let t = test_app(Some("k"), None);
    send(&t.app, Method::GET, "/api/qr?enrollment=TC-1", None, None).await;
    let response = t
        .app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("checkin_tokens_issued_total"));
}
