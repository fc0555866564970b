use std::sync::Arc;

use axum::body::Body;
use axum::http::{self, Request, StatusCode};
use chrono::TimeDelta;
use tower::ServiceExt;

use ephemera_blob::MemoryBlobStore;
use ephemera_core::ManualClock;
use ephemera_ledger_memory::MemoryGrantLedger;
use ephemera_lifecycle::LifecycleBuilder;
use ephemera_server::api::{AppState, router};
use ephemera_server::config::EphemeraConfig;

const BOUNDARY: &str = "ephemera-test-boundary";
const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake image payload";

// -- Helpers --------------------------------------------------------------

struct TestApp {
    state: AppState,
    blobs: Arc<MemoryBlobStore>,
    clock: Arc<ManualClock>,
}

fn build_test_app(config: EphemeraConfig) -> TestApp {
    let clock = Arc::new(ManualClock::default());
    let blobs = Arc::new(MemoryBlobStore::new());
    let ledger = Arc::new(MemoryGrantLedger::new().with_clock(clock.clone()));

    let lifecycle = LifecycleBuilder::new()
        .ledger(ledger)
        .blob_store(blobs.clone())
        .clock(clock.clone())
        .build()
        .expect("lifecycle should build");
    let state = AppState::new(lifecycle, &config).expect("state should build");

    TestApp {
        state,
        blobs,
        clock,
    }
}

fn default_app() -> TestApp {
    build_test_app(EphemeraConfig::default())
}

/// Multipart upload form. `fields` are plain text fields.
fn upload_request(filename: Option<&str>, data: &[u8], fields: &[(&str, &str)]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(filename) = filename {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(http::Method::POST)
        .uri("/upload")
        .header(
            http::header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn view_request(token: &str, pin: Option<&str>) -> Request<Body> {
    let body = serde_json::json!({ "pin": pin });
    Request::builder()
        .method(http::Method::POST)
        .uri(format!("/api/view/{token}"))
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router(app.state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn send_json(app: &TestApp, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let (status, body) = send(app, request).await;
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// Upload a PNG and return the share token.
async fn upload(app: &TestApp, fields: &[(&str, &str)]) -> String {
    let (status, json) = send_json(app, upload_request(Some("cat.png"), PNG, fields)).await;
    assert_eq!(status, StatusCode::OK, "upload failed: {json}");
    let url = json["url"].as_str().unwrap();
    url.rsplit('/').next().unwrap().to_owned()
}

// -- Tests ----------------------------------------------------------------

#[tokio::test]
async fn health_reports_counts() {
    let app = default_app();
    upload(&app, &[]).await;

    let (status, json) = send_json(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["live_grants"], 1);
    assert_eq!(json["metrics"]["uploads"], 1);
}

#[tokio::test]
async fn upload_returns_share_link_and_message() {
    let app = default_app();
    let (status, json) = send_json(
        &app,
        upload_request(Some("cat.png"), PNG, &[("max_views", "3"), ("pin", "1234")]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert!(
        json["url"]
            .as_str()
            .unwrap()
            .starts_with("http://127.0.0.1:5000/view/")
    );
    assert_eq!(
        json["message"],
        "Photo uploaded! This link will work 3 times. PIN protection enabled."
    );
    assert_eq!(json["details"]["max_views"], 3);
    assert_eq!(json["details"]["pin_protected"], true);
    assert_eq!(json["details"]["download_prevented"], false);
    assert_eq!(app.blobs.len(), 1);
}

#[tokio::test]
async fn single_view_link_works_once() {
    let app = default_app();
    let token = upload(&app, &[]).await;

    let (status, json) = send_json(&app, view_request(&token, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["views_remaining"], 0);
    let image = json["image"].as_str().unwrap();
    assert!(image.starts_with("data:image/png;base64,"));
    assert!(app.blobs.is_empty(), "blob should be deleted after last view");

    let (status, json) = send_json(&app, view_request(&token, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Photo not found");
}

#[tokio::test]
async fn pin_protected_link() {
    let app = default_app();
    let token = upload(&app, &[("max_views", "3"), ("pin", "1234")]).await;

    let (status, _) = send_json(&app, view_request(&token, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    for _ in 0..2 {
        let (status, json) = send_json(&app, view_request(&token, Some("0000"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error"], "Invalid PIN");
    }

    let (status, json) = send_json(&app, view_request(&token, Some("1234"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["views_remaining"], 2);
}

#[tokio::test]
async fn unlimited_link_reports_unlimited() {
    let app = default_app();
    let token = upload(&app, &[("max_views", "-1"), ("prevent_download", "true")]).await;

    for _ in 0..3 {
        let (status, json) = send_json(&app, view_request(&token, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["views_remaining"], "unlimited");
        assert_eq!(json["prevent_download"], true);
    }
    assert_eq!(app.blobs.len(), 1);
}

#[tokio::test]
async fn view_without_body_is_accepted() {
    let app = default_app();
    let token = upload(&app, &[]).await;

    let request = Request::builder()
        .method(http::Method::POST)
        .uri(format!("/api/view/{token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn expired_link_is_gone_and_reclaimed() {
    let app = default_app();
    let token = upload(&app, &[("max_views", "5")]).await;
    app.clock.advance(TimeDelta::hours(25));

    let (status, json) = send_json(&app, view_request(&token, None)).await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(json["error"], "Link has expired");
    assert!(app.blobs.is_empty());
}

#[tokio::test]
async fn upload_validation_errors() {
    let app = default_app();

    let (status, json) = send_json(&app, upload_request(None, PNG, &[("max_views", "1")])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No photo provided");

    let (status, json) = send_json(&app, upload_request(Some("doc.pdf"), PNG, &[])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().starts_with("Invalid file type"));

    let (status, json) =
        send_json(&app, upload_request(Some("cat.png"), PNG, &[("pin", "12ab")])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "PIN must be exactly 4 digits");

    let (status, _) =
        send_json(&app, upload_request(Some("cat.png"), PNG, &[("max_views", "0")])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(app.blobs.is_empty(), "rejected uploads store nothing");
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let mut config = EphemeraConfig::default();
    config.upload.max_bytes = 8;
    let app = build_test_app(config);

    let (status, json) = send_json(&app, upload_request(Some("cat.png"), PNG, &[])).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(json["error"].as_str().unwrap().starts_with("File too large"));
    assert!(app.blobs.is_empty());
}

#[tokio::test]
async fn grant_description_does_not_spend_views() {
    let app = default_app();
    let token = upload(&app, &[("pin", "9876")]).await;

    for _ in 0..2 {
        let (status, json) = send_json(&app, get(&format!("/api/grants/{token}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["pin_required"], true);
        assert_eq!(json["views_remaining"], 1);
        assert!(json.get("pin_hash").is_none());
    }

    let (status, _) = send_json(&app, view_request(&token, Some("9876"))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn view_page_renders() {
    let app = default_app();
    let token = upload(&app, &[("pin", "1111")]).await;

    let (status, body) = send(&app, get(&format!("/view/{token}"))).await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains(&token));
    assert!(html.contains("pin-form"));

    let (status, body) = send(&app, get("/view/does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(
        String::from_utf8(body)
            .unwrap()
            .contains("Photo not found or link expired")
    );
}

#[tokio::test]
async fn index_page_renders() {
    let app = default_app();
    let (status, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("upload-form"));
}

#[tokio::test]
async fn cleanup_sweeps_expired_grants() {
    let app = default_app();
    upload(&app, &[]).await;
    upload(&app, &[("max_views", "-1")]).await;
    app.clock.advance(TimeDelta::hours(24));
    upload(&app, &[]).await;

    let request = Request::builder()
        .method(http::Method::POST)
        .uri("/api/cleanup")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cleaned"], 2);
    assert_eq!(json["failed"], 0);
    assert_eq!(app.blobs.len(), 1);
}

#[tokio::test]
async fn cors_echoes_only_allowed_origins() {
    let mut config = EphemeraConfig::default();
    config.server.allowed_origins = vec!["https://photos.example.com".to_owned()];
    let app = build_test_app(config);

    let from = |origin: &str| {
        Request::builder()
            .uri("/health")
            .header(http::header::ORIGIN, origin)
            .body(Body::empty())
            .unwrap()
    };

    let response = router(app.state.clone())
        .oneshot(from("https://evil.example.net"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .get(http::header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );

    let response = router(app.state.clone())
        .oneshot(from("https://photos.example.com"))
        .await
        .unwrap();
    assert_eq!(
        response
            .headers()
            .get(http::header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("https://photos.example.com")
    );
}
