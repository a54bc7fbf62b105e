//! Integration tests for ridecast-podcast API endpoints

mod helpers;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use helpers::*;
use http_body_util::BodyExt;
use ridecast_podcast::models::AnalysisStatus;
use ridecast_podcast::services::{CompletionPoller, InMemoryAnalysisSource};
use ridecast_podcast::AppState;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

const IPHONE_UA: &str =
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 Mobile/15E148";

struct TestApp {
    app: Router,
    store: Arc<FakeStore>,
    worker: Arc<FakeWorker>,
    generator: Arc<FakeGenerator>,
}

/// Test helper: app over fakes with a fast poller
async fn create_test_app(store: FakeStore, release_after: Duration) -> TestApp {
    let t = build_pipeline(
        FakeGenerator::default(),
        FakeWorker::default(),
        store,
        CompletionPoller::new(Duration::from_millis(10), Duration::from_secs(30)),
        release_after,
    );

    let source = InMemoryAnalysisSource::new();
    source.insert(completed_record()).await;

    let mut pending = completed_record();
    pending.analysis_id = "pending".to_string();
    pending.status = AnalysisStatus::Processing;
    source.insert(pending).await;

    let mut ownerless = completed_record();
    ownerless.analysis_id = "ownerless".to_string();
    ownerless.owner_id = String::new();
    source.insert(ownerless).await;

    let state = AppState::new(
        Arc::new(t.pipeline),
        Arc::new(source),
        t.downloads,
        t.event_bus,
    );

    TestApp {
        app: ridecast_podcast::build_router(state),
        store: t.store,
        worker: t.worker,
        generator: t.generator,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, headers, body)
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = send(app, request).await;
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn start_request(analysis_id: &str, user_agent: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(format!("/podcasts/{}", analysis_id));
    if let Some(ua) = user_agent {
        builder = builder.header(header::USER_AGENT, ua);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Poll the status endpoint until the run reaches `state`
async fn wait_for_state(app: &Router, analysis_id: &str, state: &str) -> Value {
    for _ in 0..300 {
        let (status, json) = send_json(app, get(&format!("/podcasts/{}/status", analysis_id))).await;
        assert_eq!(status, StatusCode::OK);
        if json["state"] == state {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("run for {} never reached {}", analysis_id, state);
}

#[tokio::test]
async fn test_health_endpoint() {
    let t = create_test_app(FakeStore::ready_on(1), Duration::from_secs(60)).await;

    let (status, json) = send_json(&t.app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "ridecast-podcast");
    assert_eq!(json["active_runs"], 0);
    assert!(json.get("last_error").is_none());
}

#[tokio::test]
async fn test_start_generates_and_serves_attachment() {
    let t = create_test_app(FakeStore::ready_on(2), Duration::from_secs(60)).await;

    let (status, json) = send_json(&t.app, start_request("a1", None, None)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(json["run_id"].is_string());
    assert_eq!(json["state"], "IDLE");

    let done = wait_for_state(&t.app, "a1", "COMPLETED").await;
    assert_eq!(done["owner_id"], "u1");
    assert_eq!(done["filename"], "Spring Show Test.mp3");
    assert_eq!(done["reused_existing"], false);
    assert_eq!(t.generator.calls(), 4);
    assert_eq!(t.worker.submissions(), 1);

    let url = done["download_url"].as_str().unwrap().to_string();
    let (status, headers, body) = send(&t.app, get(&url)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "audio/mpeg");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Spring Show Test.mp3\""
    );
    assert_eq!(body, AUDIO_BYTES);
}

#[tokio::test]
async fn test_mobile_safari_gets_inline_download() {
    let t = create_test_app(FakeStore::ready_on(1), Duration::from_secs(60)).await;

    let (status, _) = send_json(&t.app, start_request("a1", Some(IPHONE_UA), None)).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let done = wait_for_state(&t.app, "a1", "COMPLETED").await;
    assert_eq!(done["reused_existing"], true);
    assert_eq!(t.worker.submissions(), 0);

    let (_, headers, _) = send(&t.app, get(done["download_url"].as_str().unwrap())).await;
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "inline; filename=\"Spring Show Test.mp3\""
    );
}

#[tokio::test]
async fn test_explicit_delivery_and_document_name() {
    let t = create_test_app(FakeStore::ready_on(1), Duration::from_secs(60)).await;

    let body = json!({"delivery": "inline", "document_name": "Renamed Sheet.png"});
    let (status, _) = send_json(&t.app, start_request("a1", None, Some(body))).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let done = wait_for_state(&t.app, "a1", "COMPLETED").await;
    assert_eq!(done["filename"], "Renamed Sheet.mp3");
    let (_, headers, _) = send(&t.app, get(done["download_url"].as_str().unwrap())).await;
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "inline; filename=\"Renamed Sheet.mp3\""
    );
}

#[tokio::test]
async fn test_duplicate_start_conflicts_then_cancel() {
    let t = create_test_app(FakeStore::never_ready(), Duration::from_secs(60)).await;

    let (status, _) = send_json(&t.app, start_request("a1", None, None)).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, json) = send_json(&t.app, start_request("a1", None, None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "CONFLICT");

    wait_for_state(&t.app, "a1", "POLLING").await;
    let (status, json) = send_json(&t.app, cancel_request("a1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cancel_requested"], true);

    let cancelled = wait_for_state(&t.app, "a1", "CANCELLED").await;
    assert!(cancelled["error"].is_null());
    let probes_after_cancel = t.store.probe_count();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(t.store.probe_count(), probes_after_cancel);

    // Nothing left to cancel
    let (status, _) = send_json(&t.app, cancel_request("a1")).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // A finished run no longer blocks a new start
    let (status, _) = send_json(&t.app, start_request("a1", None, None)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
}

fn cancel_request(analysis_id: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/podcasts/{}/cancel", analysis_id))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_start_errors() {
    let t = create_test_app(FakeStore::ready_on(1), Duration::from_secs(60)).await;

    let (status, json) = send_json(&t.app, start_request("missing", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "ANALYSIS_NOT_FOUND");

    let (status, json) = send_json(&t.app, start_request("pending", None, None)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"]["code"], "ANALYSIS_NOT_READY");

    let (status, json) = send_json(&t.app, start_request("ownerless", None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "MISSING_IDENTITY");

    let (status, _) = send_json(
        &t.app,
        start_request("a1", None, Some(json!({"owner_id": "someone-else"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // None of the refused starts touched the artifact store
    assert_eq!(t.store.probe_count(), 0);
}

#[tokio::test]
async fn test_malformed_start_body_rejected() {
    let t = create_test_app(FakeStore::ready_on(1), Duration::from_secs(60)).await;

    for body in [
        json!({"delivery": "download"}),
        json!({"ownerid": "u1"}),
        json!({"owner_id": 42}),
    ] {
        let (status, json) = send_json(&t.app, start_request("a1", None, Some(body.clone()))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted {}", body);
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    let request = Request::builder()
        .method("POST")
        .uri("/podcasts/a1")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send_json(&t.app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(t.store.probe_count(), 0);
    assert_eq!(t.generator.calls(), 0);

    // An empty JSON object is still the default request
    let (status, _) = send_json(&t.app, start_request("a1", None, Some(json!({})))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_owner_from_body_fills_blank_record() {
    let t = create_test_app(FakeStore::ready_on(1), Duration::from_secs(60)).await;

    let (status, _) = send_json(
        &t.app,
        start_request("ownerless", None, Some(json!({"owner_id": "u9"}))),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let done = wait_for_state(&t.app, "ownerless", "COMPLETED").await;
    assert_eq!(done["owner_id"], "u9");
    let probed = t.store.probed_urls.lock().unwrap().clone();
    assert_eq!(probed, vec!["https://storage.test/podcasts/u9_ownerless/podcast.mp3"]);
}

#[tokio::test]
async fn test_status_and_cancel_unknown_run() {
    let t = create_test_app(FakeStore::ready_on(1), Duration::from_secs(60)).await;

    let (status, json) = send_json(&t.app, get("/podcasts/a1/status")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "NOT_FOUND");

    let (status, _) = send_json(&t.app, cancel_request("a1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_handle_revoked_after_release_delay() {
    let t = create_test_app(FakeStore::ready_on(1), Duration::from_millis(200)).await;

    send_json(&t.app, start_request("a1", None, None)).await;
    let done = wait_for_state(&t.app, "a1", "COMPLETED").await;
    let url = done["download_url"].as_str().unwrap().to_string();

    let (status, _, _) = send(&t.app, get(&url)).await;
    assert_eq!(status, StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(500)).await;
    let (status, json) = send_json(&t.app, get(&url)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_unknown_download_handle() {
    let t = create_test_app(FakeStore::ready_on(1), Duration::from_secs(60)).await;

    let (status, _) = send_json(
        &t.app,
        get("/downloads/00000000-0000-0000-0000-000000000000"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_failed_run_reports_error_and_last_error() {
    let t = build_pipeline(
        FakeGenerator::failing_on(1),
        FakeWorker::default(),
        FakeStore::ready_on(2),
        CompletionPoller::new(Duration::from_millis(10), Duration::from_secs(1)),
        Duration::from_secs(60),
    );
    let source = InMemoryAnalysisSource::new();
    source.insert(completed_record()).await;
    let app = ridecast_podcast::build_router(AppState::new(
        Arc::new(t.pipeline),
        Arc::new(source),
        t.downloads,
        t.event_bus,
    ));

    let (status, _) = send_json(&app, start_request("a1", None, None)).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let failed = wait_for_state(&app, "a1", "FAILED").await;
    assert_eq!(failed["error"]["kind"], "stage_generation_error");
    assert!(failed["message"].as_str().unwrap().contains("overview"));

    // last_error is written by the background task after the run record
    for _ in 0..100 {
        let (_, health) = send_json(&app, get("/health")).await;
        if health.get("last_error").is_some() {
            assert!(health["last_error"].as_str().unwrap().contains("overview"));
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("last_error never reported");
}
