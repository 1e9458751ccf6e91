//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                        - Liveness check
//! GET    /health/ready                  - Readiness check (database)
//!
//! # Auth
//! POST   /api/auth/register             - Create a buyer account
//! POST   /api/auth/login                - Issue access and refresh tokens
//! POST   /api/auth/refresh              - Exchange a refresh token (bearer)
//! GET    /api/auth/me                   - Caller's profile (access token)
//! GET    /api/auth/profile              - Alias of /me
//!
//! # Products
//! POST   /api/products/get-products     - Search, filter, sort and page
//! GET    /api/products/categories       - Category list
//! POST   /api/products/categories       - Create category (admin)
//! DELETE /api/products/categories/{id}  - Delete unused category (admin)
//! POST   /api/products/create           - Create product (admin)
//! POST   /api/products/                 - Create product (admin)
//! GET    /api/products/{id}             - Product detail
//! PUT    /api/products/{id}             - Update product (admin)
//! DELETE /api/products/{id}             - Delete product (admin)
//! ```

pub mod auth;
pub mod products;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
};
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/me", get(auth::me))
        .route("/profile", get(auth::me))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(products::create))
        .route("/create", post(products::create))
        .route("/get-products", post(products::list))
        .route(
            "/categories",
            get(products::list_categories).post(products::create_category),
        )
        .route("/categories/{id}", delete(products::delete_category))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::destroy),
        )
}

/// Create all routes for the API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/auth", auth_routes())
        .nest("/api/products", product_routes())
        // A nested "/" only matches "/api/products"; the trailing-slash form is registered here.
        .route("/api/products/", post(products::create))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.catalog().health_check().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Parse a JSON request body. An empty body reads as `{}`.
///
/// The body is taken as raw bytes so that a missing `Content-Type` or an
/// empty body does not trip axum's `Json` rejection.
pub(crate) fn parse_body<T>(body: &Bytes) -> Result<T, AppError>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "rejected request body");
        AppError::BadRequest("Invalid JSON body".to_string())
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Body {
        name: Option<String>,
    }

    #[test]
    fn test_parse_body_empty_is_default() {
        assert_eq!(parse_body::<Body>(&Bytes::new()).unwrap(), Body::default());
        assert_eq!(
            parse_body::<Body>(&Bytes::from_static(b"  \n")).unwrap(),
            Body::default()
        );
    }

    #[test]
    fn test_parse_body_json() {
        let body = parse_body::<Body>(&Bytes::from_static(br#"{"name":"x"}"#)).unwrap();
        assert_eq!(body.name.as_deref(), Some("x"));
    }

    #[test]
    fn test_parse_body_malformed_is_bad_request() {
        let err = parse_body::<Body>(&Bytes::from_static(b"{not json")).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
