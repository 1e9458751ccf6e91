//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::db::{CatalogStore, PgCatalogRepository, PgUserRepository, UserStore};
use crate::services::auth::TokenIssuer;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// repositories, the token issuer and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    tokens: TokenIssuer,
    users: Arc<dyn UserStore>,
    catalog: Arc<dyn CatalogStore>,
}

impl AppState {
    /// Create application state backed by `PostgreSQL`.
    #[must_use]
    pub fn new(config: ApiConfig, pool: PgPool) -> Self {
        let users = Arc::new(PgUserRepository::new(pool.clone()));
        let catalog = Arc::new(PgCatalogRepository::new(pool));
        Self::with_stores(config, users, catalog)
    }

    /// Create application state over arbitrary repository implementations.
    #[must_use]
    pub fn with_stores(
        config: ApiConfig,
        users: Arc<dyn UserStore>,
        catalog: Arc<dyn CatalogStore>,
    ) -> Self {
        let tokens = TokenIssuer::new(&config.jwt);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                tokens,
                users,
                catalog,
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the token issuer.
    #[must_use]
    pub fn tokens(&self) -> &TokenIssuer {
        &self.inner.tokens
    }

    /// Get the user repository.
    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.inner.users.as_ref()
    }

    /// Get the catalog repository.
    #[must_use]
    pub fn catalog(&self) -> &dyn CatalogStore {
        self.inner.catalog.as_ref()
    }
}
