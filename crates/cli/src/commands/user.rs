//! User account management commands.
//!
//! Self-registration over HTTP always creates buyers; admins are created or
//! promoted here.
//!
//! # Environment Variables
//!
//! Loads the full API configuration, so `MARKETPLACE_DATABASE_URL` and
//! `MARKETPLACE_JWT_SECRET` must both be set.

use marketplace_api::{config::ApiConfig, db, services::AuthService, state::AppState};
use marketplace_core::Role;

use super::CommandError;

fn parse_role(role: &str) -> Result<Role, CommandError> {
    role.parse()
        .map_err(|_| CommandError::InvalidRole(role.to_owned()))
}

async fn connect() -> Result<AppState, CommandError> {
    let config = ApiConfig::from_env()?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url).await?;
    Ok(AppState::new(config, pool))
}

/// Create a user account with the given role.
///
/// # Errors
///
/// Returns an error for an invalid role or email, a taken email or username,
/// or a database failure.
pub async fn create(
    email: &str,
    password: &str,
    username: Option<&str>,
    role: &str,
) -> Result<(), CommandError> {
    let role = parse_role(role)?;
    let state = connect().await?;

    let user = AuthService::new(state.users(), state.tokens())
        .create_account(email, password, username, role)
        .await?;

    tracing::info!(
        user_id = %user.id,
        username = %user.username,
        role = %user.role,
        "User created"
    );
    Ok(())
}

/// Change the role of an existing account.
///
/// # Errors
///
/// Returns an error for an invalid role, an unknown email, or a database
/// failure.
pub async fn set_role(email: &str, role: &str) -> Result<(), CommandError> {
    let role = parse_role(role)?;
    let state = connect().await?;

    let user = AuthService::new(state.users(), state.tokens())
        .set_role(email, role)
        .await?;

    tracing::info!(user_id = %user.id, role = %user.role, "Role updated");
    Ok(())
}
