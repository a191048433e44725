mod common;

use axum::http::{Method, StatusCode};

use common::app::spawn_test_app;
use common::http::{request, response_json};

#[tokio::test]
async fn health_reports_ok() {
    let app = spawn_test_app().await;

    let resp = request(&app.app, Method::GET, "/health", None, &[]).await;
    let (status, _, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn ready_reports_store_and_backend() {
    let app = spawn_test_app().await;

    let resp = request(&app.app, Method::GET, "/health/ready", None, &[]).await;
    let (status, _, body) = response_json(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["generation_backend"], "mock");
}

#[tokio::test]
async fn responses_carry_request_id() {
    let app = spawn_test_app().await;

    let resp = request(&app.app, Method::GET, "/health", None, &[]).await;
    assert!(resp.headers().get("x-request-id").is_some());

    let resp = request(
        &app.app,
        Method::GET,
        "/health",
        None,
        &[("x-request-id", "my-trace-42".to_string())],
    )
    .await;
    assert_eq!(
        resp.headers().get("x-request-id").unwrap().to_str().unwrap(),
        "my-trace-42"
    );
}
