//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`.
//! Every error body has the shape `{"msg": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::{AuthError, TokenError};
use crate::services::catalog::CatalogError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Catalog operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but lacks the required role.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request conflicts with existing state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::InvalidEmail(_)
                | AuthError::InvalidUsername(_)
                | AuthError::MissingFields => StatusCode::BAD_REQUEST,
                AuthError::InvalidCredentials | AuthError::Token(_) => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists | AuthError::UsernameTaken => StatusCode::CONFLICT,
                AuthError::UserNotFound => StatusCode::NOT_FOUND,
                AuthError::PasswordHash | AuthError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Catalog(err) => match err {
                CatalogError::Validation(_) | CatalogError::Query(_) => StatusCode::BAD_REQUEST,
                CatalogError::ProductNotFound | CatalogError::CategoryNotFound => {
                    StatusCode::NOT_FOUND
                }
                CatalogError::CategoryExists | CatalogError::CategoryInUse => StatusCode::CONFLICT,
                CatalogError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    /// Message shown to the client. Server-side details are never exposed.
    fn client_message(&self) -> String {
        if self.status().is_server_error() {
            return "Internal server error".to_string();
        }

        match self {
            Self::Auth(err) => match err {
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::InvalidUsername(msg) => format!("Invalid username: {msg}"),
                AuthError::MissingFields => "Email and password are required".to_string(),
                AuthError::InvalidCredentials => "Invalid credentials".to_string(),
                AuthError::UserAlreadyExists => "User already exists".to_string(),
                AuthError::UsernameTaken => "Username already taken".to_string(),
                AuthError::UserNotFound => "User not found".to_string(),
                AuthError::Token(token) => token_message(token).to_string(),
                AuthError::PasswordHash | AuthError::Repository(_) => {
                    "Internal server error".to_string()
                }
            },
            Self::Catalog(err) => match err {
                CatalogError::ProductNotFound => "Product not found".to_string(),
                CatalogError::CategoryNotFound => "Category not found".to_string(),
                CatalogError::CategoryExists => "Category already exists".to_string(),
                CatalogError::CategoryInUse => {
                    "Category is still used by products".to_string()
                }
                other => other.to_string(),
            },
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg)
            | Self::Conflict(msg) => msg.clone(),
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}

/// Client-facing description of a token failure.
#[must_use]
pub const fn token_message(err: &TokenError) -> &'static str {
    match err {
        TokenError::Expired => "Token has expired",
        TokenError::WrongType { .. } => "Wrong token type",
        TokenError::Invalid | TokenError::Encoding(_) => "Invalid token",
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        (status, Json(json!({ "msg": self.client_message() }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Called after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use marketplace_core::QueryError;

    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            AppError::Unauthorized("t".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::Forbidden("t".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::Conflict("t".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::from(AuthError::UserAlreadyExists).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(AuthError::Token(TokenError::Expired)).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(CatalogError::CategoryInUse).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(CatalogError::Query(QueryError::InvalidTimestamp {
                field: "created_from",
                value: "x".into()
            }))
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(RepositoryError::NotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_body_is_msg_json() {
        let (status, body) = body_json(AppError::from(CatalogError::ProductNotFound)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "msg": "Product not found" }));
    }

    #[tokio::test]
    async fn test_server_errors_hide_details() {
        let (status, body) = body_json(AppError::from(RepositoryError::DataCorruption(
            "secret table detail".into(),
        )))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "msg": "Internal server error" }));
    }

    #[tokio::test]
    async fn test_validation_message_passes_through() {
        let (_, body) =
            body_json(AppError::from(CatalogError::Validation("name and price are required".into())))
                .await;
        assert_eq!(body["msg"], "name and price are required");
    }
}
