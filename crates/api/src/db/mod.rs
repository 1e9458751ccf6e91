//! Database operations for the marketplace `PostgreSQL`.
//!
//! ## Tables
//!
//! - `users` - Accounts with Argon2id password hashes and roles
//! - `categories` - Product categories (unique names)
//! - `products` - Catalog entries, optionally referencing a category
//!
//! Handlers reach storage only through the [`UserStore`] and [`CatalogStore`]
//! traits. [`PgUserRepository`] and [`PgCatalogRepository`] implement them
//! over a connection pool; `memory::MemoryStore` implements both in process
//! for tests.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p marketplace-cli -- migrate
//! ```

pub mod catalog;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use marketplace_core::{CategoryId, Email, ProductId, ProductQuery, Role, UserId};

use crate::models::{Category, NewProduct, NewUser, Product, ProductChanges, ProductPage, User};

pub use catalog::PgCatalogRepository;
pub use users::PgUserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation; carries the name of the conflicting field.
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A foreign key points at a row that does not exist.
    #[error("invalid reference: {0}")]
    InvalidReference(String),
}

/// Persistence for user accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict("email" | "username")` on a
    /// uniqueness violation.
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError>;

    /// Look up a user by exact email.
    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Look up a user by username.
    async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;

    /// Look up a user by ID.
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Change a user's role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    async fn set_role(&self, id: UserId, role: Role) -> Result<User, RepositoryError>;
}

/// Persistence for categories and products.
///
/// Every mutating method is atomic: on error nothing is written.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Verify the store is reachable.
    async fn health_check(&self) -> Result<(), RepositoryError>;

    /// All categories in ID order.
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError>;

    /// Insert every name not already present. Returns how many were inserted.
    async fn ensure_categories(&self, names: &[String]) -> Result<u64, RepositoryError>;

    /// Insert a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict("name")` if the name is taken.
    async fn create_category(&self, name: &str) -> Result<Category, RepositoryError>;

    /// Delete a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown ID and
    /// `RepositoryError::Conflict("products")` while products reference it.
    async fn delete_category(&self, id: CategoryId) -> Result<(), RepositoryError>;

    /// Look up a product by ID.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Run a listing query and return the requested page.
    async fn search_products(&self, query: &ProductQuery) -> Result<ProductPage, RepositoryError>;

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidReference("category")` if the
    /// category does not exist.
    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError>;

    /// Apply a partial update and refresh `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown ID and
    /// `RepositoryError::InvalidReference("category")` for an unknown category.
    async fn update_product(
        &self,
        id: ProductId,
        changes: ProductChanges,
    ) -> Result<Product, RepositoryError>;

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    async fn delete_product(&self, id: ProductId) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
