//! Authentication error types.

use thiserror::Error;

use super::token::TokenError;
use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] marketplace_core::EmailError),

    /// Invalid username (too long or otherwise unusable).
    #[error("invalid username: {0}")]
    InvalidUsername(String),

    /// A required field was missing or blank.
    #[error("email and password are required")]
    MissingFields,

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Email already registered.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Username already registered.
    #[error("username already taken")]
    UsernameTaken,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// Token could not be issued or verified.
    #[error("token error: {0}")]
    Token(#[from] TokenError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
