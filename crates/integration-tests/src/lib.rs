//! Integration tests for the marketplace API.
//!
//! Tests drive the real [`axum::Router`] in-process with
//! [`tower::ServiceExt::oneshot`], backed by the in-memory repository, so no
//! database or running server is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p marketplace-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use marketplace_api::{
    app,
    config::{ApiConfig, JwtConfig},
    db::memory::MemoryStore,
    models::{NewProduct, Product},
    services::AuthService,
    state::AppState,
};
use marketplace_core::{CategoryId, Price, ProductId, Role};

/// Signing secret used by every test app.
pub const TEST_JWT_SECRET: &str = "Zq8#pL2!vR6@tY1$wE4%uI7^oP0&aS3*";

/// A response with its decoded JSON body.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// An in-process API instance over an in-memory store.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub state: AppState,
    router: Router,
}

/// Configuration for tests.
#[must_use]
pub fn test_config() -> ApiConfig {
    ApiConfig {
        database_url: SecretString::from("postgres://localhost/unused"),
        host: "127.0.0.1".parse().unwrap(),
        port: 5000,
        jwt: JwtConfig {
            secret: SecretString::from(TEST_JWT_SECRET.to_owned()),
            access_ttl: Duration::from_secs(3600),
            refresh_ttl: Duration::from_secs(86_400),
        },
        seed_categories: vec!["Electronics".into(), "Books".into()],
        cors_origins: Vec::new(),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 1.0,
    }
}

impl TestApp {
    /// A fresh app with an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// A fresh app with the given configuration.
    #[must_use]
    pub fn with_config(config: ApiConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::with_stores(config, store.clone(), store.clone());
        let router = app(state.clone());
        Self {
            store,
            state,
            router,
        }
    }

    /// Send a request and decode the JSON body (`Value::Null` if not JSON).
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.send(builder.body(body).unwrap()).await
    }

    /// Send a prebuilt request.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, uri, token, None).await
    }

    /// Register over HTTP and log in, returning the login response body.
    pub async fn register_and_login(&self, email: &str, password: &str) -> Value {
        let res = self
            .post(
                "/api/auth/register",
                None,
                serde_json::json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{:?}", res.body);

        let res = self
            .post(
                "/api/auth/login",
                None,
                serde_json::json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK, "{:?}", res.body);
        res.body
    }

    /// Access token of a freshly registered buyer.
    pub async fn buyer_token(&self, email: &str) -> String {
        let body = self.register_and_login(email, "buyer-password").await;
        body["access_token"].as_str().unwrap().to_owned()
    }

    /// Access token of a freshly created admin.
    pub async fn admin_token(&self, email: &str) -> String {
        AuthService::new(self.state.users(), self.state.tokens())
            .create_account(email, "admin-password", None, Role::Admin)
            .await
            .unwrap();

        let res = self
            .post(
                "/api/auth/login",
                None,
                serde_json::json!({ "email": email, "password": "admin-password" }),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK, "{:?}", res.body);
        res.body["access_token"].as_str().unwrap().to_owned()
    }

    /// Change a user's role directly in the store.
    pub async fn set_role(&self, email: &str, role: Role) {
        AuthService::new(self.state.users(), self.state.tokens())
            .set_role(email, role)
            .await
            .unwrap();
    }

    /// Insert a product fixture with a fixed ID and creation time.
    pub async fn insert_product(
        &self,
        id: i32,
        name: &str,
        price: i64,
        category_id: Option<CategoryId>,
        created_at: DateTime<Utc>,
    ) -> Product {
        self.store
            .insert_product_at(
                ProductId::new(id),
                NewProduct {
                    name: name.to_owned(),
                    price: Price::new(Decimal::from(price)).unwrap(),
                    description: None,
                    image_url: None,
                    in_stock: true,
                    category_id,
                },
                created_at,
            )
            .await
            .unwrap()
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// IDs of the products in a listing response, in order.
#[must_use]
pub fn product_ids(body: &Value) -> Vec<i64> {
    body["products"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect()
}
