//! Product and category route handlers.
//!
//! Reads are public; every mutation requires an admin (see
//! [`RequireAdmin`]).

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use marketplace_core::{CategoryId, PageRequest, ProductFilter, ProductId};

use super::parse_body;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{Category, Product};
use crate::services::CatalogService;
use crate::services::catalog::{CreateProductInput, UpdateProductInput};
use crate::state::AppState;

// =============================================================================
// Request / Response Types
// =============================================================================

/// Pagination query parameters.
///
/// Values that are absent or not integers fall back to the defaults.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    #[serde(alias = "per_page")]
    pub limit: Option<String>,
}

impl PageParams {
    fn to_request(&self) -> PageRequest {
        PageRequest::new(lenient_int(self.page.as_deref()), lenient_int(self.limit.as_deref()))
    }
}

fn lenient_int(value: Option<&str>) -> Option<i64> {
    value.and_then(|s| s.trim().parse().ok())
}

/// One page of products.
#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub products: Vec<Product>,
    pub total: u64,
    pub pages: u64,
    pub current_page: u64,
}

/// A single product.
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub product: Product,
}

/// A product after a mutation.
#[derive(Debug, Serialize)]
pub struct ProductMutationResponse {
    pub msg: &'static str,
    pub product: Product,
}

/// All categories.
#[derive(Debug, Serialize)]
pub struct CategoryListResponse {
    pub categories: Vec<Category>,
}

/// Category creation body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateCategoryRequest {
    pub name: Option<String>,
}

/// A category after creation.
#[derive(Debug, Serialize)]
pub struct CategoryMutationResponse {
    pub msg: &'static str,
    pub category: Category,
}

/// A bare confirmation.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub msg: &'static str,
}

fn product_id(raw: &str) -> Result<ProductId> {
    raw.parse()
        .map_err(|_| AppError::NotFound("Product not found".to_string()))
}

fn category_id(raw: &str) -> Result<CategoryId> {
    raw.parse()
        .map_err(|_| AppError::NotFound("Category not found".to_string()))
}

// =============================================================================
// Products
// =============================================================================

/// Search, filter, sort and page the catalog.
///
/// POST /api/products/get-products?page=&limit=
///
/// # Errors
///
/// 400 for a malformed body or date bound.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
    body: Bytes,
) -> Result<Json<ProductListResponse>> {
    let filter: ProductFilter = parse_body(&body)?;
    let catalog = CatalogService::new(state.catalog());

    let page = catalog.list_products(filter, params.to_request()).await?;

    Ok(Json(ProductListResponse {
        products: page.products,
        total: page.window.total,
        pages: page.window.pages,
        current_page: page.window.page,
    }))
}

/// Product detail.
///
/// GET /api/products/{id}
///
/// # Errors
///
/// 404 if the product does not exist.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>> {
    let id = product_id(&id)?;
    let product = CatalogService::new(state.catalog()).get_product(id).await?;
    Ok(Json(ProductResponse { product }))
}

/// Create a product.
///
/// POST /api/products/create, POST /api/products/
///
/// # Errors
///
/// 400 for invalid input or an unknown category.
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    body: Bytes,
) -> Result<(StatusCode, Json<ProductMutationResponse>)> {
    let input: CreateProductInput = parse_body(&body)?;
    let product = CatalogService::new(state.catalog())
        .create_product(input)
        .await?;

    tracing::debug!(admin_id = %admin.id, product_id = %product.id, "admin created product");

    Ok((
        StatusCode::CREATED,
        Json(ProductMutationResponse {
            msg: "Product created successfully",
            product,
        }),
    ))
}

/// Partially update a product.
///
/// PUT /api/products/{id}
///
/// # Errors
///
/// 404 for an unknown product, 400 for invalid input.
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<ProductMutationResponse>> {
    let id = product_id(&id)?;
    let input: UpdateProductInput = parse_body(&body)?;
    let product = CatalogService::new(state.catalog())
        .update_product(id, input)
        .await?;

    Ok(Json(ProductMutationResponse {
        msg: "Product updated successfully",
        product,
    }))
}

/// Delete a product.
///
/// DELETE /api/products/{id}
///
/// # Errors
///
/// 404 for an unknown product.
pub async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let id = product_id(&id)?;
    CatalogService::new(state.catalog())
        .delete_product(id)
        .await?;

    Ok(Json(MessageResponse {
        msg: "Product deleted successfully",
    }))
}

// =============================================================================
// Categories
// =============================================================================

/// All categories in ID order.
///
/// GET /api/products/categories
///
/// # Errors
///
/// 500 if the store fails.
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<CategoryListResponse>> {
    let categories = CatalogService::new(state.catalog())
        .list_categories()
        .await?;
    Ok(Json(CategoryListResponse { categories }))
}

/// Create a category.
///
/// POST /api/products/categories
///
/// # Errors
///
/// 400 for a blank name, 409 for a duplicate.
pub async fn create_category(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    body: Bytes,
) -> Result<(StatusCode, Json<CategoryMutationResponse>)> {
    let req: CreateCategoryRequest = parse_body(&body)?;
    let category = CatalogService::new(state.catalog())
        .create_category(req.name.as_deref().unwrap_or_default())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CategoryMutationResponse {
            msg: "Category created successfully",
            category,
        }),
    ))
}

/// Delete a category no product references.
///
/// DELETE /api/products/categories/{id}
///
/// # Errors
///
/// 404 for an unknown category, 409 while products still use it.
pub async fn delete_category(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let id = category_id(&id)?;
    CatalogService::new(state.catalog())
        .delete_category(id)
        .await?;

    Ok(Json(MessageResponse {
        msg: "Category deleted successfully",
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_page_params_are_lenient() {
        let params = PageParams {
            page: Some("3".into()),
            limit: Some("abc".into()),
        };
        let req = params.to_request();
        assert_eq!(req.page(), 3);
        assert_eq!(req.limit(), 10);

        let req = PageParams::default().to_request();
        assert_eq!((req.page(), req.limit()), (1, 10));

        let params = PageParams {
            page: Some("-2".into()),
            limit: Some(" 25 ".into()),
        };
        let req = params.to_request();
        assert_eq!((req.page(), req.limit()), (1, 25));
    }

    #[test]
    fn test_path_ids() {
        assert_eq!(product_id("7").unwrap(), ProductId::new(7));
        assert_eq!(
            product_id("seven").unwrap_err().status(),
            StatusCode::NOT_FOUND
        );
        assert!(category_id("x").is_err());
    }
}
