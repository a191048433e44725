use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use tower::util::ServiceExt;

/// Drive one request through the router without binding a socket.
pub async fn request(
    app: &Router,
    method: Method,
    path: &str,
    body: Option<Value>,
    headers: &[(&str, String)],
) -> Response {
    let builder = headers.iter().fold(
        Request::builder().method(method).uri(path),
        |b, (name, value)| b.header(*name, value.as_str()),
    );

    let req = match body {
        Some(payload) => builder
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("build request");

    app.clone().oneshot(req).await.expect("route request")
}

pub async fn response_json(resp: Response) -> (StatusCode, HeaderMap, Value) {
    let status = resp.status();
    let headers = resp.headers().clone();
    let (_, text) = collect_text(resp.into_body()).await;
    let json = if text.is_empty() {
        serde_json::json!({})
    } else {
        serde_json::from_str::<Value>(&text).expect("json body")
    };
    (status, headers, json)
}

pub async fn response_text(resp: Response) -> (StatusCode, String) {
    let status = resp.status();
    let (_, text) = collect_text(resp.into_body()).await;
    (status, text)
}

async fn collect_text(body: Body) -> (usize, String) {
    let bytes = to_bytes(body, usize::MAX).await.expect("drain body");
    (bytes.len(), String::from_utf8_lossy(&bytes).to_string())
}

pub fn assert_json_error(body: &Value, code: &str) {
    assert_eq!(body["code"], code, "unexpected error body: {body}");
    assert!(body.get("message").is_some());
}
