//! Authentication route handlers.

use axum::{Json, body::Bytes, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use marketplace_core::UserId;

use super::parse_body;
use crate::error::Result;
use crate::middleware::{BearerToken, RequireAuth};
use crate::models::PublicUser;
use crate::services::AuthService;
use crate::state::AppState;

// =============================================================================
// Request / Response Types
// =============================================================================

/// Registration request body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub username: Option<String>,
}

/// Registration response body.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub msg: &'static str,
    pub user_id: UserId,
    pub username: String,
}

/// Login request body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Login response body.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

/// Refresh response body.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Profile response body.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: PublicUser,
}

// =============================================================================
// Handlers
// =============================================================================

/// Register a new buyer account.
///
/// POST /api/auth/register
///
/// # Errors
///
/// 400 for missing or invalid fields, 409 for a taken email or username.
pub async fn register(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let req: RegisterRequest = parse_body(&body)?;
    let auth = AuthService::new(state.users(), state.tokens());

    let user = auth
        .register(
            req.email.as_deref().unwrap_or_default(),
            req.password.as_deref().unwrap_or_default(),
            req.username.as_deref(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            msg: "User created successfully",
            user_id: user.id,
            username: user.username,
        }),
    ))
}

/// Log in with email and password.
///
/// POST /api/auth/login
///
/// # Errors
///
/// 400 for missing fields, 401 for bad credentials.
pub async fn login(State(state): State<AppState>, body: Bytes) -> Result<Json<LoginResponse>> {
    let req: LoginRequest = parse_body(&body)?;
    let auth = AuthService::new(state.users(), state.tokens());

    let (user, tokens) = auth
        .login(
            req.email.as_deref().unwrap_or_default(),
            req.password.as_deref().unwrap_or_default(),
        )
        .await?;

    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(LoginResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        user: PublicUser::from(user),
    }))
}

/// Exchange a refresh token for a new access token.
///
/// POST /api/auth/refresh
///
/// # Errors
///
/// 401 if the bearer token is missing, invalid, expired or an access token.
pub async fn refresh(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<Json<RefreshResponse>> {
    let auth = AuthService::new(state.users(), state.tokens());
    let access_token = auth.refresh(&token)?;
    Ok(Json(RefreshResponse { access_token }))
}

/// The caller's own profile.
///
/// GET /api/auth/me, GET /api/auth/profile
///
/// # Errors
///
/// 401 without a valid access token, 404 if the account is gone.
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(user_id): RequireAuth,
) -> Result<Json<ProfileResponse>> {
    let auth = AuthService::new(state.users(), state.tokens());
    let user = auth.profile(user_id).await?;
    Ok(Json(ProfileResponse {
        user: PublicUser::from(user),
    }))
}
