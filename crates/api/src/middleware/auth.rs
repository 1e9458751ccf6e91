//! Authentication extractors.
//!
//! Bearer tokens are read from the `Authorization` header:
//!
//! - [`RequireAuth`] accepts any valid access token.
//! - [`RequireAdmin`] additionally re-reads the user and requires the admin
//!   role, so a demotion takes effect on the very next request.
//! - [`BearerToken`] yields the raw token for endpoints that verify it
//!   themselves (token refresh).

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};

use marketplace_core::UserId;

use crate::db::RepositoryError;
use crate::error::{AppError, set_sentry_user, token_message};
use crate::models::User;
use crate::services::auth::{TokenError, TokenKind};
use crate::state::AppState;

/// Error returned when a request does not carry the required credentials.
#[derive(Debug)]
pub enum AuthRejection {
    /// No bearer token in the request.
    MissingToken,
    /// Token failed verification.
    InvalidToken(TokenError),
    /// Valid token, but the user is not an admin (or no longer exists).
    Forbidden,
    /// The user lookup failed.
    Lookup(RepositoryError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let err = match self {
            Self::MissingToken => AppError::Unauthorized("Missing authorization token".to_string()),
            Self::InvalidToken(e) => AppError::Unauthorized(token_message(&e).to_string()),
            Self::Forbidden => AppError::Forbidden("Admin access required".to_string()),
            Self::Lookup(e) => AppError::Database(e),
        };
        err.into_response()
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Extractor for the raw bearer token.
pub struct BearerToken(pub String);

impl FromRequestParts<AppState> for BearerToken {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        bearer_token(parts)
            .map(|t| Self(t.to_owned()))
            .ok_or(AuthRejection::MissingToken)
    }
}

/// Extractor that requires a valid access token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user_id): RequireAuth) -> String {
///     format!("Hello, user {user_id}!")
/// }
/// ```
pub struct RequireAuth(pub UserId);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthRejection::MissingToken)?;
        let user_id = state
            .tokens()
            .verify(token, TokenKind::Access)
            .map_err(AuthRejection::InvalidToken)?;

        set_sentry_user(&user_id);
        Ok(Self(user_id))
    }
}

/// Extractor that requires a valid access token belonging to an admin.
///
/// The role comes from the user store, not from the token.
pub struct RequireAdmin(pub User);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(user_id) = RequireAuth::from_request_parts(parts, state).await?;

        let user = state
            .users()
            .get_by_id(user_id)
            .await
            .map_err(AuthRejection::Lookup)?
            .ok_or(AuthRejection::Forbidden)?;

        if !user.role.is_admin() {
            tracing::warn!(user_id = %user.id, "non-admin attempted an admin action");
            return Err(AuthRejection::Forbidden);
        }

        Ok(Self(user))
    }
}
