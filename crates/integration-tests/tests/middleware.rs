//! Health checks and cross-cutting response behavior.

#![allow(clippy::unwrap_used)]

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use marketplace_integration_tests::TestApp;

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new();
    assert_eq!(app.get("/health", None).await.status, StatusCode::OK);
    assert_eq!(app.get("/health/ready", None).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_is_generated() {
    let app = TestApp::new();
    let res = app.get("/health", None).await;
    let id = res.headers.get("x-request-id").unwrap().to_str().unwrap();
    assert_eq!(id.len(), 36);
}

#[tokio::test]
async fn test_upstream_request_id_is_echoed() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/products/categories")
        .header("x-request-id", "edge-42")
        .body(Body::empty())
        .unwrap();

    let res = app.send(request).await;

    assert_eq!(res.headers.get("x-request-id").unwrap(), "edge-42");
}

#[tokio::test]
async fn test_errors_carry_request_id_and_msg() {
    let app = TestApp::new();
    let res = app.get("/api/products/12345", None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert!(res.headers.contains_key("x-request-id"));
    assert_eq!(res.body["msg"], "Product not found");
}

#[tokio::test]
async fn test_cors_allows_any_origin_by_default() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/products/categories")
        .header("origin", "https://shop.example")
        .body(Body::empty())
        .unwrap();

    let res = app.send(request).await;

    assert_eq!(res.headers.get("access-control-allow-origin").unwrap(), "*");
}
