//! Seed reference data.

use marketplace_api::{
    config::{ApiConfig, DEFAULT_SEED_CATEGORIES},
    db::{self, PgCatalogRepository},
    services::CatalogService,
};

use super::CommandError;

/// Ensure categories exist. With no names, the configured seed set is used.
///
/// Reads `MARKETPLACE_SEED_CATEGORIES` when set, falling back to the built-in
/// defaults.
///
/// # Errors
///
/// Returns an error if the database is unreachable or an insert fails.
pub async fn categories(names: &[String]) -> Result<(), CommandError> {
    // Also loads `.env`, so it must come before reading the seed list.
    let database_url = ApiConfig::database_url_from_env()?;

    let names = if names.is_empty() {
        default_names()
    } else {
        names.to_vec()
    };

    let pool = db::create_pool(&database_url).await?;
    let repo = PgCatalogRepository::new(pool);

    let created = CatalogService::new(&repo).ensure_categories(&names).await?;

    tracing::info!(requested = names.len(), created, "Categories seeded");
    Ok(())
}

fn default_names() -> Vec<String> {
    std::env::var("MARKETPLACE_SEED_CATEGORIES").map_or_else(
        |_| DEFAULT_SEED_CATEGORIES.iter().map(ToString::to_string).collect(),
        |raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
                .collect()
        },
    )
}
