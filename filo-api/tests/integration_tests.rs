//! Integration tests for the Filo API endpoints
//!
//! The service runs against an in-memory timer fetcher and a recording
//! sink, so ingest flows are checked end to end down to the deliveries.

use axum_test::TestServer;
use chrono::{Duration, Utc};
use filo_api::{create_router, AppState};
use filo_core::TimerRecord;
use filo_tracker::{FiloService, MockSink, StaticRegionFetcher, TrackerConfig};
use serde_json::json;
use std::sync::Arc;

struct TestContext {
    server: TestServer,
    service: Arc<FiloService>,
    sink: Arc<MockSink>,
    fetcher: Arc<StaticRegionFetcher>,
}

/// Create test service with in-memory collaborators
async fn create_test_service(sink: Arc<MockSink>, fetcher: Arc<StaticRegionFetcher>) -> Arc<FiloService> {
    let service = FiloService::builder()
        .config(TrackerConfig::development())
        .fetcher(fetcher)
        .sink(sink)
        .build()
        .await
        .unwrap();
    Arc::new(service)
}

/// Create test server
async fn create_test_server() -> TestContext {
    let sink = Arc::new(MockSink::new());
    let fetcher = Arc::new(StaticRegionFetcher::new());
    let service = create_test_service(sink.clone(), fetcher.clone()).await;
    let router = create_router(AppState::new(service.clone()));
    TestContext {
        server: TestServer::new(router).unwrap(),
        service,
        sink,
        fetcher,
    }
}

async fn subscribe_sb_a(server: &TestServer, destination: u64) {
    let response = server
        .post("/subscriptions")
        .json(&json!({
            "destination": destination,
            "world": "Mateus",
            "category": "SB_A",
            "events": "FINDS, DEATHS"
        }))
        .await;
    response.assert_status_ok();
}

fn erle_report() -> serde_json::Value {
    json!({ "id": 6002, "wId": 37, "x": 0, "y": 100, "lastAlive": "True", "i": 1 })
}

// ============ Health Endpoint Tests ============

#[tokio::test]
async fn test_health_check() {
    let ctx = create_test_server().await;

    let response = ctx.server.get("/health").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service_status"], "INITIALIZING");
    assert!(body["catalogue_targets"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_ready_check() {
    let ctx = create_test_server().await;

    let body: serde_json::Value = ctx.server.get("/ready").await.json();
    assert_eq!(body["status"], "starting");

    ctx.service.start().await;
    let response = ctx.server.get("/ready").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ready");
    assert_eq!(body["tracked_worlds"], 8);

    ctx.service.stop().await;
}

// ============ Ingest Endpoint Tests ============

#[tokio::test]
async fn test_webhook_report_is_delivered_once() {
    let ctx = create_test_server().await;
    subscribe_sb_a(&ctx.server, 1).await;

    let response = ctx.server.post("/reports/xivhunt").json(&erle_report()).await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["accepted"], true);
    assert_eq!(body["outcome"]["kind"], "find");
    assert_eq!(body["outcome"]["outcome"], "notified");
    assert_eq!(body["outcome"]["deliveries"], 1);

    let body: serde_json::Value = ctx
        .server
        .post("/reports/xivhunt")
        .json(&erle_report())
        .await
        .json();
    assert_eq!(body["outcome"]["outcome"], "duplicate");
    assert_eq!(ctx.sink.sent().await.len(), 1);
}

#[tokio::test]
async fn test_malformed_reports_are_acknowledged() {
    let ctx = create_test_server().await;

    let response = ctx.server.post("/reports/xivhunt").text("not json").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["accepted"], false);
    assert!(body["error"].as_str().unwrap().contains("unreadable"));

    let body: serde_json::Value = ctx
        .server
        .post("/reports/nobody")
        .json(&erle_report())
        .await
        .json();
    assert_eq!(body["accepted"], false);

    let body: serde_json::Value = ctx
        .server
        .post("/reports/xivhunt")
        .json(&json!({ "wId": 37 }))
        .await
        .json();
    assert_eq!(body["accepted"], false);
    assert!(ctx.sink.sent().await.is_empty());
}

#[tokio::test]
async fn test_form_and_relay_reports() {
    let ctx = create_test_server().await;
    subscribe_sb_a(&ctx.server, 1).await;

    let response = ctx
        .server
        .post("/reports/relay/form")
        .form(&json!({ "target": "orcus", "world": "Mateus", "coords": "10.5,11.2" }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["accepted"], true);
    assert_eq!(body["outcome"]["outcome"], "notified");

    let body: serde_json::Value = ctx
        .server
        .post("/relay/relay")
        .text("target=vochstein world=Mateus coords=20.1,8.4")
        .await
        .json();
    assert_eq!(body["accepted"], true);
    assert_eq!(ctx.sink.sent().await.len(), 2);

    let body: serde_json::Value = ctx.server.post("/relay/relay").text("   ").await.json();
    assert_eq!(body["accepted"], false);
}

// ============ Status Endpoint Tests ============

#[tokio::test]
async fn test_status_lookup() {
    let ctx = create_test_server().await;

    let response = ctx.server.get("/status/mateus/erle").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["world"], "Mateus");
    assert_eq!(body["name"], "Erle");
    assert_eq!(body["status"]["status"], "CLOSED");
    assert!(body["found"].is_null());

    ctx.server.post("/reports/xivhunt").json(&erle_report()).await;
    let body: serde_json::Value = ctx.server.get("/status/Mateus/6002").await.json();
    assert!(!body["found"].is_null());
}

#[tokio::test]
async fn test_status_errors() {
    let ctx = create_test_server().await;

    let response = ctx.server.get("/status/Nowhere/erle").await;
    response.assert_status_not_found();
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND");

    ctx.server
        .get("/status/Mateus/nobody")
        .await
        .assert_status_not_found();

    ctx.server
        .get("/status/Mateus/erle")
        .add_query_param("instance", 7)
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn test_recheck() {
    let ctx = create_test_server().await;
    let now = Utc::now();
    ctx.fetcher
        .set_timer(
            "Crystal",
            "Mateus",
            "6002_1",
            TimerRecord {
                world: "Mateus".to_string(),
                instance: 1,
                open_date: Some((now - Duration::seconds(10)).timestamp_millis()),
                max_date: Some((now + Duration::seconds(600)).timestamp_millis()),
                ..Default::default()
            },
        )
        .await;
    ctx.service.tracker().track_world("Mateus").await;
    ctx.service.tracker().track_world("Balmung").await;

    let response = ctx.server.post("/recheck").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["worlds_checked"], 2);
    assert_eq!(body["worlds_failed"], 0);
    assert_eq!(body["changes"], 0);
}

#[tokio::test]
async fn test_recheck_with_timer_service_down() {
    let ctx = create_test_server().await;
    ctx.fetcher.set_failing("Crystal", true).await;
    ctx.service.tracker().track_world("Mateus").await;

    let response = ctx.server.post("/recheck").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["worlds_checked"], 0);
    assert_eq!(body["worlds_failed"], 1);
}

// ============ Subscription Endpoint Tests ============

#[tokio::test]
async fn test_subscription_lifecycle() {
    let ctx = create_test_server().await;
    subscribe_sb_a(&ctx.server, 5).await;

    let body: serde_json::Value = ctx.server.get("/subscriptions/5").await.json();
    assert_eq!(body["subscriptions"].as_array().unwrap().len(), 2);
    assert!(body["meta"]["notifier"].is_null());

    ctx.server
        .put("/destinations/5/notifier")
        .json(&json!({ "mention": "@hunters" }))
        .await
        .assert_status_ok();
    let body: serde_json::Value = ctx.server.get("/subscriptions/5").await.json();
    assert_eq!(body["meta"]["notifier"], "@hunters");

    ctx.server
        .delete("/destinations/5/notifier")
        .await
        .assert_status_ok();

    let body: serde_json::Value = ctx
        .server
        .delete("/subscriptions")
        .json(&json!({
            "destination": 5,
            "world": "Mateus",
            "category": "SB_A",
            "events": "DEATHS"
        }))
        .await
        .json();
    assert_eq!(body["changed"], 1);

    let body: serde_json::Value = ctx.server.delete("/subscriptions/5").await.json();
    assert_eq!(body["changed"], 1);
    let body: serde_json::Value = ctx.server.get("/subscriptions/5").await.json();
    assert!(body["subscriptions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_subscribe_datacenter() {
    let ctx = create_test_server().await;

    let body: serde_json::Value = ctx
        .server
        .post("/subscriptions")
        .json(&json!({
            "destination": 9,
            "datacenter": "Crystal",
            "category": "stormblood_s",
            "events": "OPENINGS"
        }))
        .await
        .json();

    assert_eq!(body["changed"], 8);
}

#[tokio::test]
async fn test_subscription_validation() {
    let ctx = create_test_server().await;

    let response = ctx
        .server
        .post("/subscriptions")
        .json(&json!({ "destination": 1, "world": "Mateus", "category": "nonsense" }))
        .await;
    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALIDATION_ERROR");

    ctx.server
        .post("/subscriptions")
        .json(&json!({ "destination": 1, "category": "SB_A" }))
        .await
        .assert_status_bad_request();

    ctx.server
        .post("/subscriptions")
        .json(&json!({ "destination": 1, "world": "Nowhere", "category": "SB_A" }))
        .await
        .assert_status_not_found();

    ctx.server
        .put("/destinations/1/notifier")
        .json(&json!({ "mention": "  " }))
        .await
        .assert_status_bad_request();
}

// ============ Train Endpoint Tests ============

#[tokio::test]
async fn test_train_lifecycle() {
    let ctx = create_test_server().await;

    let response = ctx
        .server
        .post("/trains")
        .json(&json!({ "world": "mateus", "destination": 3 }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["world"], "Mateus");
    assert_eq!(body["phase"], "NOT_STARTED");
    assert_eq!(body["total"], 12);
    assert_eq!(ctx.sink.sent_to(filo_core::DestinationId(3)).await.len(), 1);

    let body: serde_json::Value = ctx
        .server
        .post("/trains/Mateus/kills")
        .json(&json!({ "target": "erle" }))
        .await
        .json();
    assert_eq!(body["phase"], "IN_PROGRESS");
    assert_eq!(body["kills"], 1);
    assert_eq!(body["previous_target"], "Erle");

    let body: serde_json::Value = ctx.server.get("/trains/Mateus").await.json();
    assert_eq!(body["kills"], 1);

    ctx.server.delete("/trains/Mateus").await.assert_status_ok();
    ctx.server.get("/trains/Mateus").await.assert_status_not_found();
}

#[tokio::test]
async fn test_train_errors() {
    let ctx = create_test_server().await;

    ctx.server
        .post("/trains")
        .json(&json!({ "world": "Nowhere" }))
        .await
        .assert_status_not_found();

    ctx.server
        .post("/trains")
        .json(&json!({ "world": "Mateus", "starting_target": "Bone Crawler" }))
        .await
        .assert_status_not_found();

    ctx.server
        .post("/trains/Mateus/kills")
        .json(&json!({ "target": "erle" }))
        .await
        .assert_status_not_found();
}
