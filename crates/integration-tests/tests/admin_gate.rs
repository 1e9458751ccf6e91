//! Role checks on catalog mutations.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use marketplace_core::Role;
use marketplace_integration_tests::TestApp;
use serde_json::json;

fn phone() -> serde_json::Value {
    json!({ "name": "Phone", "price": 500 })
}

#[tokio::test]
async fn test_buyer_cannot_create_product() {
    let app = TestApp::new();
    let token = app.buyer_token("buyer@example.com").await;

    let res = app.post("/api/products/create", Some(&token), phone()).await;

    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert!(res.body["msg"].is_string());
}

#[tokio::test]
async fn test_anonymous_cannot_create_product() {
    let app = TestApp::new();
    let res = app.post("/api/products/create", None, phone()).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert!(res.body["msg"].is_string());
}

#[tokio::test]
async fn test_admin_can_create_product() {
    let app = TestApp::new();
    let token = app.admin_token("admin@example.com").await;

    let res = app.post("/api/products/create", Some(&token), phone()).await;
    assert_eq!(res.status, StatusCode::CREATED, "{:?}", res.body);
    assert_eq!(res.body["product"]["name"], "Phone");

    let root = app.post("/api/products/", Some(&token), phone()).await;
    assert_eq!(root.status, StatusCode::CREATED, "{:?}", root.body);

    let bare = app.post("/api/products", Some(&token), phone()).await;
    assert_eq!(bare.status, StatusCode::CREATED, "{:?}", bare.body);
}

#[tokio::test]
async fn test_buyer_cannot_create_product_at_root() {
    let app = TestApp::new();
    let token = app.buyer_token("buyer@example.com").await;

    let res = app.post("/api/products/", Some(&token), phone()).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_demoted_admin_rejected_on_next_request() {
    let app = TestApp::new();
    let token = app.admin_token("admin@example.com").await;
    assert_eq!(
        app.post("/api/products/create", Some(&token), phone()).await.status,
        StatusCode::CREATED
    );

    app.set_role("admin@example.com", Role::Buyer).await;

    let res = app.post("/api/products/create", Some(&token), phone()).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_promoted_buyer_gains_access() {
    let app = TestApp::new();
    let token = app.buyer_token("buyer@example.com").await;
    app.set_role("buyer@example.com", Role::Admin).await;

    let res = app.post("/api/products/create", Some(&token), phone()).await;
    assert_eq!(res.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_every_mutation_is_gated() {
    let app = TestApp::new();
    let token = app.buyer_token("buyer@example.com").await;

    let checks = [
        app.put("/api/products/1", Some(&token), json!({ "name": "x" })).await,
        app.delete("/api/products/1", Some(&token)).await,
        app.post("/api/products/categories", Some(&token), json!({ "name": "x" })).await,
        app.delete("/api/products/categories/1", Some(&token)).await,
    ];

    for res in checks {
        assert_eq!(res.status, StatusCode::FORBIDDEN);
    }
}
