//! CLI command implementations.

pub mod migrate;
pub mod seed;
pub mod user;

use marketplace_api::config::ConfigError;
use marketplace_api::services::{AuthError, CatalogError};
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: buyer, admin")]
    InvalidRole(String),

    /// Account operation failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Catalog operation failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
