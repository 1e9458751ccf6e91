//! Authentication service.
//!
//! Provides password registration and login, token refresh, and the account
//! management used by the CLI.

mod error;
pub mod token;

pub use error::AuthError;
pub use token::{TokenError, TokenIssuer, TokenKind, TokenPair};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use marketplace_core::{Email, HashedPassword, Role, UserId};

use crate::db::{RepositoryError, UserStore};
use crate::models::{NewUser, User};

/// Maximum username length (`users.username VARCHAR(64)`).
pub const MAX_USERNAME_LENGTH: usize = 64;

/// Authentication service.
///
/// Handles user registration, login and token refresh.
pub struct AuthService<'a> {
    users: &'a dyn UserStore,
    tokens: &'a TokenIssuer,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: &'a dyn UserStore, tokens: &'a TokenIssuer) -> Self {
        Self { users, tokens }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Register a new buyer account.
    ///
    /// `username` defaults to the local part of the email when absent or blank.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingFields` if the email is blank or the password is empty.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    /// Returns `AuthError::UsernameTaken` if the username is already registered.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        username: Option<&str>,
    ) -> Result<User, AuthError> {
        self.create_account(email, password, username, Role::Buyer)
            .await
    }

    /// Create an account with an explicit role.
    ///
    /// # Errors
    ///
    /// Same as [`AuthService::register`].
    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
        username: Option<&str>,
        role: Role,
    ) -> Result<User, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields);
        }

        let email = Email::parse(email)?;
        let username = resolve_username(&email, username)?;

        if self.users.get_by_email(&email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }
        if self.users.get_by_username(&username).await?.is_some() {
            return Err(AuthError::UsernameTaken);
        }

        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create_user(NewUser {
                username,
                email,
                password_hash,
                role,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(field) if field == "username" => AuthError::UsernameTaken,
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, role = %user.role, "user registered");
        Ok(user)
    }

    /// Login with email and password, issuing an access/refresh pair.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingFields` if the email is blank or the password is empty.
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, TokenPair), AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields);
        }

        // An address that cannot exist gets the same answer as an unknown one.
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &user.password_hash)?;

        let tokens = self.tokens.issue_pair(user.id)?;
        Ok((user, tokens))
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The refresh token itself is not rotated.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if the token is invalid, expired or not a
    /// refresh token.
    pub fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let user_id = self.tokens.verify(refresh_token, TokenKind::Refresh)?;
        Ok(self.tokens.issue(user_id, TokenKind::Access)?)
    }

    /// Load the profile of an authenticated user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user no longer exists.
    pub async fn profile(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    // =========================================================================
    // Account Management
    // =========================================================================

    /// Change the role of the user with the given email.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if no user has that email.
    pub async fn set_role(&self, email: &str, role: Role) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let updated = self.users.set_role(user.id, role).await.map_err(|e| match e {
            RepositoryError::NotFound => AuthError::UserNotFound,
            other => AuthError::Repository(other),
        })?;

        tracing::info!(user_id = %updated.id, role = %updated.role, "user role changed");
        Ok(updated)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Pick the username for a new account.
fn resolve_username(email: &Email, requested: Option<&str>) -> Result<String, AuthError> {
    let Some(name) = requested.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(email.default_username());
    };

    if name.chars().count() > MAX_USERNAME_LENGTH {
        return Err(AuthError::InvalidUsername(format!(
            "must be at most {MAX_USERNAME_LENGTH} characters"
        )));
    }

    Ok(name.to_owned())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<HashedPassword, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| HashedPassword::from_phc(hash.to_string()))
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &HashedPassword) -> Result<(), AuthError> {
    let parsed_hash =
        PasswordHash::new(hash.as_phc()).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;

    use super::*;
    use crate::config::JwtConfig;
    use crate::db::memory::MemoryStore;

    fn tokens() -> TokenIssuer {
        TokenIssuer::new(&JwtConfig {
            secret: SecretString::from("Zq8#pL2!vR6@tY1$wE4%uI7^oP0&aS3*".to_owned()),
            access_ttl: Duration::from_secs(3600),
            refresh_ttl: Duration::from_secs(86_400),
        })
    }

    #[test]
    fn test_hash_is_salted_and_verifies() {
        let a = hash_password("hunter22").unwrap();
        let b = hash_password("hunter22").unwrap();
        assert_ne!(a, b);
        assert!(a.as_phc().starts_with("$argon2id$"));
        assert!(verify_password("hunter22", &a).is_ok());
        assert!(matches!(
            verify_password("hunter23", &a),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_resolve_username() {
        let email = Email::parse("sam.lee@example.com").unwrap();
        assert_eq!(resolve_username(&email, None).unwrap(), "sam.lee");
        assert_eq!(resolve_username(&email, Some("  ")).unwrap(), "sam.lee");
        assert_eq!(resolve_username(&email, Some(" sam ")).unwrap(), "sam");
        assert!(matches!(
            resolve_username(&email, Some(&"x".repeat(65))),
            Err(AuthError::InvalidUsername(_))
        ));
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let store = MemoryStore::new();
        let tokens = tokens();
        let auth = AuthService::new(&store, &tokens);

        let user = auth.register("ann@example.com", "pw-1234", None).await.unwrap();
        assert_eq!(user.username, "ann");
        assert_eq!(user.role, Role::Buyer);

        let (logged_in, pair) = auth.login("ann@example.com", "pw-1234").await.unwrap();
        assert_eq!(logged_in.id, user.id);
        assert_eq!(tokens.verify(&pair.access_token, TokenKind::Access).unwrap(), user.id);
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates_and_blanks() {
        let store = MemoryStore::new();
        let tokens = tokens();
        let auth = AuthService::new(&store, &tokens);

        auth.register("ann@example.com", "pw", Some("ann")).await.unwrap();

        assert!(matches!(
            auth.register("ann@example.com", "other", Some("ann2")).await,
            Err(AuthError::UserAlreadyExists)
        ));
        assert!(matches!(
            auth.register("ann@other.org", "pw", None).await,
            Err(AuthError::UsernameTaken)
        ));
        assert!(matches!(
            auth.register("", "pw", None).await,
            Err(AuthError::MissingFields)
        ));
        assert!(matches!(
            auth.register("bob@example.com", "", None).await,
            Err(AuthError::MissingFields)
        ));
        // Only presence is checked; a whitespace password is accepted and usable.
        auth.register("bob@example.com", " ", None).await.unwrap();
        auth.login("bob@example.com", " ").await.unwrap();
        assert!(matches!(
            auth.register("not-an-email", "pw", None).await,
            Err(AuthError::InvalidEmail(_))
        ));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let store = MemoryStore::new();
        let tokens = tokens();
        let auth = AuthService::new(&store, &tokens);
        auth.register("ann@example.com", "right", None).await.unwrap();

        let wrong_password = auth.login("ann@example.com", "wrong").await.unwrap_err();
        let unknown_email = auth.login("nobody@example.com", "right").await.unwrap_err();
        let malformed = auth.login("nobody", "right").await.unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_email, AuthError::InvalidCredentials));
        assert!(matches!(malformed, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_refresh_requires_refresh_token() {
        let store = MemoryStore::new();
        let tokens = tokens();
        let auth = AuthService::new(&store, &tokens);
        auth.register("ann@example.com", "pw", None).await.unwrap();
        let (user, pair) = auth.login("ann@example.com", "pw").await.unwrap();

        let access = auth.refresh(&pair.refresh_token).unwrap();
        assert_eq!(tokens.verify(&access, TokenKind::Access).unwrap(), user.id);

        assert!(matches!(
            auth.refresh(&pair.access_token),
            Err(AuthError::Token(TokenError::WrongType { .. }))
        ));
    }

    #[tokio::test]
    async fn test_set_role() {
        let store = MemoryStore::new();
        let tokens = tokens();
        let auth = AuthService::new(&store, &tokens);
        let user = auth.register("ann@example.com", "pw", None).await.unwrap();

        let promoted = auth.set_role("ann@example.com", Role::Admin).await.unwrap();
        assert_eq!(promoted.id, user.id);
        assert!(promoted.role.is_admin());
        assert!(auth.profile(user.id).await.unwrap().role.is_admin());

        assert!(matches!(
            auth.set_role("ghost@example.com", Role::Admin).await,
            Err(AuthError::UserNotFound)
        ));
    }
}
