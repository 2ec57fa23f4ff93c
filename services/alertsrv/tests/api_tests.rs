//! Admin API integration tests

#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::util::ServiceExt;

mod common;
use crate::common::create_test_app;

/// Helper to make JSON requests
async fn json_request(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = if let Some(json) = body {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap()
    } else {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    };

    let response = app.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let body: Value = if body_bytes.is_empty() {
        json!({})
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&body_bytes).into_owned())
        })
    };

    (status, body)
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app().await.unwrap();

    let (status, body) = json_request(&app.router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".to_string()));
}

#[tokio::test]
async fn test_status_endpoint() {
    let app = create_test_app().await.unwrap();

    let (status, body) = json_request(&app.router, "GET", "/api/v1/status", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "alertsrv");
    assert_eq!(body["state"], "idle");
    assert_eq!(body["fake_alert_pending"], false);
}

#[tokio::test]
async fn test_track_list_untrack() {
    let app = create_test_app().await.unwrap();
    let uri = "/api/v1/subscribers/42/areas";

    let (status, body) =
        json_request(&app.router, "POST", uri, Some(json!({"area": "X"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["subscriber_id"], 42);
    assert_eq!(body["area"], "X");

    let (status, body) =
        json_request(&app.router, "POST", uri, Some(json!({"area": "X"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already tracks"));

    let (status, body) = json_request(&app.router, "GET", uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) =
        json_request(&app.router, "DELETE", "/api/v1/subscribers/42/areas/X", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], true);

    let (status, body) =
        json_request(&app.router, "DELETE", "/api/v1/subscribers/42/areas/X", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], false);
}

#[tokio::test]
async fn test_blank_area_rejected() {
    let app = create_test_app().await.unwrap();

    let (status, _) = json_request(
        &app.router,
        "POST",
        "/api/v1/subscribers/1/areas",
        Some(json!({"area": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reconcile_notifies_and_lists_alerts() {
    let app = create_test_app().await.unwrap();
    app.ledger.track(7, "X").await.unwrap();
    app.source.set(&["X", "Y"]);

    let (status, body) = json_request(&app.router, "POST", "/api/v1/reconcile", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active_alerts"], 2);
    assert_eq!(body["started"]["sent"], 1);

    let sent = app.transport.sent.lock().unwrap().clone();
    assert_eq!(sent, vec![(7, "X: тривога!".to_string())]);

    let (status, body) = json_request(&app.router, "GET", "/api/v1/alerts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([{"id": "X", "kind": "a"}, {"id": "Y", "kind": "a"}])
    );
}

#[tokio::test]
async fn test_fake_alert_slot() {
    let app = create_test_app().await.unwrap();
    let uri = "/api/v1/fake-alerts";

    let (status, _) = json_request(&app.router, "POST", uri, Some(json!({"area": "X"}))).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, _) = json_request(&app.router, "POST", uri, Some(json!({"area": "Y"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = json_request(&app.router, "POST", "/api/v1/reconcile", None).await;
    assert_eq!(body["active_alerts"], 1);

    let (status, _) = json_request(&app.router, "POST", uri, Some(json!({"area": "Y"}))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_map_rendered_once_then_cached() {
    let app = create_test_app().await.unwrap();
    app.source.set(&["X"]);
    json_request(&app.router, "POST", "/api/v1/reconcile", None).await;

    let (status, first) = json_request(&app.router, "GET", "/api/v1/map", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["cached"], false);
    assert_eq!(first["artifact"]["key"], "X");
    assert_eq!(first["artifact"]["handle"], "photo-1");

    let (_, second) = json_request(&app.router, "GET", "/api/v1/map", None).await;
    assert_eq!(second["cached"], true);
    assert_eq!(second["artifact"]["handle"], "photo-1");
    assert_eq!(*app.transport.uploads.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_log_level_requires_initialized_logging() {
    let app = create_test_app().await.unwrap();

    let (status, body) = json_request(&app.router, "GET", "/api/v1/log-level", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["level"], "unknown");

    let (status, body) = json_request(
        &app.router,
        "PUT",
        "/api/v1/log-level",
        Some(json!({"level": "debug"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("not initialized"));
}
