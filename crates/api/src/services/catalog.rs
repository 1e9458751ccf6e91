//! Catalog service: products and categories.
//!
//! Validates client input into domain values and delegates persistence to a
//! [`CatalogStore`]. Authorization is enforced before these methods are
//! reached (see `crate::middleware::auth`).

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use marketplace_core::{
    CategoryId, PageRequest, Price, PriceError, ProductFilter, ProductId, QueryError,
};

use crate::db::{CatalogStore, RepositoryError};
use crate::models::{Category, NewProduct, Product, ProductChanges, ProductPage};

/// Maximum product name length (`products.name VARCHAR(100)`).
pub const MAX_PRODUCT_NAME_LENGTH: usize = 100;

/// Maximum image URL length (`products.image_url VARCHAR(255)`).
pub const MAX_IMAGE_URL_LENGTH: usize = 255;

/// Maximum category name length (`categories.name VARCHAR(100)`).
pub const MAX_CATEGORY_NAME_LENGTH: usize = 100;

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Client input failed validation.
    #[error("{0}")]
    Validation(String),

    /// Listing filter failed validation.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Product does not exist.
    #[error("product not found")]
    ProductNotFound,

    /// Category does not exist.
    #[error("category not found")]
    CategoryNotFound,

    /// A category with that name already exists.
    #[error("category already exists")]
    CategoryExists,

    /// Category is still referenced by products.
    #[error("category is still used by products")]
    CategoryInUse,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<PriceError> for CatalogError {
    fn from(err: PriceError) -> Self {
        Self::Validation(err.to_string())
    }
}

// =============================================================================
// Input
// =============================================================================

/// Body of a product creation request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateProductInput {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub in_stock: Option<bool>,
    #[serde(alias = "category")]
    pub category_id: Option<CategoryId>,
}

/// Body of a product update request.
///
/// For `description`, `image_url` and `category_id` an explicit `null`
/// clears the value while an absent key leaves it untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    #[serde(deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub image_url: Option<Option<String>>,
    pub in_stock: Option<bool>,
    #[serde(alias = "category", deserialize_with = "present")]
    pub category_id: Option<Option<CategoryId>>,
}

/// Marks a key as present, keeping `null` distinguishable from absence.
fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn validate_name(name: &str) -> Result<String, CatalogError> {
    let name = name.trim();
    if name.chars().count() > MAX_PRODUCT_NAME_LENGTH {
        return Err(CatalogError::Validation(format!(
            "name must be at most {MAX_PRODUCT_NAME_LENGTH} characters"
        )));
    }
    Ok(name.to_owned())
}

fn validate_image_url(url: Option<String>) -> Result<Option<String>, CatalogError> {
    match url {
        Some(url) if url.chars().count() > MAX_IMAGE_URL_LENGTH => Err(CatalogError::Validation(
            format!("image_url must be at most {MAX_IMAGE_URL_LENGTH} characters"),
        )),
        other => Ok(other),
    }
}

impl CreateProductInput {
    /// Validate into an insertable product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for a blank name, missing or
    /// negative price, or over-long fields.
    pub fn validate(self) -> Result<NewProduct, CatalogError> {
        let name = match self.name.as_deref().map(validate_name).transpose()? {
            Some(name) if !name.is_empty() => name,
            _ => return Err(CatalogError::Validation("name and price are required".into())),
        };
        let price = self
            .price
            .ok_or_else(|| CatalogError::Validation("name and price are required".into()))?;

        Ok(NewProduct {
            name,
            price: Price::new(price)?,
            description: self.description,
            image_url: validate_image_url(self.image_url)?,
            in_stock: self.in_stock.unwrap_or(true),
            category_id: self.category_id,
        })
    }
}

impl UpdateProductInput {
    /// Validate into a set of changes.
    ///
    /// A blank name is ignored rather than rejected.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for a negative price or over-long
    /// fields.
    pub fn validate(self) -> Result<ProductChanges, CatalogError> {
        let name = self
            .name
            .as_deref()
            .map(validate_name)
            .transpose()?
            .filter(|name| !name.is_empty());
        let price = self.price.map(Price::new).transpose()?;
        let image_url = self.image_url.map(validate_image_url).transpose()?;

        Ok(ProductChanges {
            name,
            price,
            description: self.description,
            image_url,
            in_stock: self.in_stock,
            category_id: self.category_id,
        })
    }
}

// =============================================================================
// Service
// =============================================================================

/// Catalog service.
pub struct CatalogService<'a> {
    catalog: &'a dyn CatalogStore,
}

impl<'a> CatalogService<'a> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(catalog: &'a dyn CatalogStore) -> Self {
        Self { catalog }
    }

    /// Search, sort and page the product catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Query` if a date bound is malformed.
    pub async fn list_products(
        &self,
        filter: ProductFilter,
        page: PageRequest,
    ) -> Result<ProductPage, CatalogError> {
        let query = filter.into_query(page)?;
        Ok(self.catalog.search_products(&query).await?)
    }

    /// Fetch one product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` if it does not exist.
    pub async fn get_product(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.catalog
            .get_product(id)
            .await?
            .ok_or(CatalogError::ProductNotFound)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for invalid input or an unknown
    /// category; nothing is written in that case.
    pub async fn create_product(&self, input: CreateProductInput) -> Result<Product, CatalogError> {
        let product = input.validate()?;
        let created = self
            .catalog
            .create_product(product)
            .await
            .map_err(reference_error)?;

        tracing::info!(product_id = %created.id, "product created");
        Ok(created)
    }

    /// Apply a partial update to a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` for an unknown product and
    /// `CatalogError::Validation` for invalid input or an unknown category.
    pub async fn update_product(
        &self,
        id: ProductId,
        input: UpdateProductInput,
    ) -> Result<Product, CatalogError> {
        let changes = input.validate()?;
        let updated = self
            .catalog
            .update_product(id, changes)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => CatalogError::ProductNotFound,
                other => reference_error(other),
            })?;

        tracing::info!(product_id = %updated.id, "product updated");
        Ok(updated)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` if it does not exist.
    pub async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError> {
        self.catalog.delete_product(id).await.map_err(|e| match e {
            RepositoryError::NotFound => CatalogError::ProductNotFound,
            other => CatalogError::Repository(other),
        })?;

        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }

    /// All categories in ID order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        Ok(self.catalog.list_categories().await?)
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for a blank or over-long name and
    /// `CatalogError::CategoryExists` for a duplicate.
    pub async fn create_category(&self, name: &str) -> Result<Category, CatalogError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CatalogError::Validation("name is required".into()));
        }
        if name.chars().count() > MAX_CATEGORY_NAME_LENGTH {
            return Err(CatalogError::Validation(format!(
                "name must be at most {MAX_CATEGORY_NAME_LENGTH} characters"
            )));
        }

        let category = self.catalog.create_category(name).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => CatalogError::CategoryExists,
            other => CatalogError::Repository(other),
        })?;

        tracing::info!(category_id = %category.id, "category created");
        Ok(category)
    }

    /// Delete a category that no product references.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::CategoryNotFound` for an unknown category and
    /// `CatalogError::CategoryInUse` while products reference it.
    pub async fn delete_category(&self, id: CategoryId) -> Result<(), CatalogError> {
        self.catalog.delete_category(id).await.map_err(|e| match e {
            RepositoryError::NotFound => CatalogError::CategoryNotFound,
            RepositoryError::Conflict(_) => CatalogError::CategoryInUse,
            other => CatalogError::Repository(other),
        })?;

        tracing::info!(category_id = %id, "category deleted");
        Ok(())
    }

    /// Ensure every named category exists. Returns how many were created.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn ensure_categories(&self, names: &[String]) -> Result<u64, CatalogError> {
        let names: Vec<String> = names
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(ToOwned::to_owned)
            .collect();
        Ok(self.catalog.ensure_categories(&names).await?)
    }
}

fn reference_error(err: RepositoryError) -> CatalogError {
    match err {
        RepositoryError::InvalidReference(_) => {
            CatalogError::Validation("category not found".into())
        }
        other => CatalogError::Repository(other),
    }
}
