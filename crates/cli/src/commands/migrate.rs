//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! mp-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `MARKETPLACE_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! Migration files live in `crates/api/migrations/`.

use marketplace_api::{config::ApiConfig, db};

use super::CommandError;

/// Run all pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let database_url = ApiConfig::database_url_from_env()?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
