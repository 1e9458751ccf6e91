//! Category and product repository for database operations.
//!
//! Listing queries are assembled with [`sqlx::QueryBuilder`]. Every value a
//! client supplies is bound as a parameter; only column names from the fixed
//! [`sort_column`] table are spliced into the SQL text.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use marketplace_core::{
    CategoryId, Price, ProductId, ProductQuery, SearchTerm, SortKey, SortOrder,
};

use super::{CatalogStore, RepositoryError};
use crate::models::{Category, NewProduct, Product, ProductChanges, ProductPage};

const PRODUCT_SELECT: &str = "SELECT p.id, p.name, p.price, p.description, p.image_url, \
     p.in_stock, p.category_id, c.name AS category_name, p.created_at, p.updated_at \
     FROM products p LEFT JOIN categories c ON c.id = p.category_id";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    price: Decimal,
    description: Option<String>,
    image_url: Option<String>,
    in_stock: bool,
    category_id: Option<i32>,
    category_name: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price for product {}: {e}", row.id))
        })?;

        let category = match (row.category_id, row.category_name) {
            (Some(id), Some(name)) => Some(Category {
                id: CategoryId::new(id),
                name,
            }),
            _ => None,
        };

        Ok(Self {
            id: ProductId::new(row.id),
            name: row.name,
            price,
            description: row.description,
            category,
            image_url: row.image_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
            in_stock: row.in_stock,
        })
    }
}

/// Repository for catalog database operations.
#[derive(Clone)]
pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// SQL expression ordered by for each sort key.
const fn sort_column(key: SortKey) -> &'static str {
    match key {
        SortKey::Id => "p.id",
        SortKey::Name => "p.name",
        SortKey::Price => "p.price",
        SortKey::Description => "p.description",
        SortKey::ImageUrl => "p.image_url",
        SortKey::InStock => "p.in_stock",
        SortKey::CategoryId => "p.category_id",
        SortKey::CreatedAt => "p.created_at",
        SortKey::UpdatedAt => "p.updated_at",
        SortKey::CategoryName => "c.name",
    }
}

/// Append the `WHERE` clause for a listing query.
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ProductQuery) {
    builder.push(" WHERE TRUE");

    match &query.search {
        Some(term @ SearchTerm::Numeric { id, .. }) => {
            let pattern = term.like_pattern();
            builder.push(" AND (");
            if let Some(id) = id {
                builder.push("p.id = ").push_bind(*id).push(" OR ");
            }
            builder
                .push(r"CAST(p.id AS TEXT) LIKE ")
                .push_bind(pattern.clone())
                .push(r" ESCAPE '\' OR p.name ILIKE ")
                .push_bind(pattern)
                .push(r" ESCAPE '\')");
        }
        Some(term @ SearchTerm::Text(_)) => {
            builder
                .push(" AND p.name ILIKE ")
                .push_bind(term.like_pattern())
                .push(r" ESCAPE '\'");
        }
        None => {}
    }

    if let Some(min) = query.min_price {
        builder.push(" AND p.price >= ").push_bind(min);
    }
    if let Some(max) = query.max_price {
        builder.push(" AND p.price <= ").push_bind(max);
    }
    if let Some(category_id) = query.category_id {
        builder.push(" AND p.category_id = ").push_bind(category_id);
    }
    if let Some(in_stock) = query.in_stock {
        builder.push(" AND p.in_stock = ").push_bind(in_stock);
    }
    if let Some(from) = query.created_from {
        builder.push(" AND p.created_at >= ").push_bind(from);
    }
    if let Some(to) = query.created_to {
        builder.push(" AND p.created_at <= ").push_bind(to);
    }
}

/// Append the `ORDER BY` clause; always ends with the `id` tie-break.
fn push_ordering(builder: &mut QueryBuilder<'_, Postgres>, query: &ProductQuery) {
    builder.push(" ORDER BY ");

    if let Some(term @ SearchTerm::Numeric { id, .. }) = &query.search {
        builder.push("CASE ");
        if let Some(id) = id {
            builder.push("WHEN p.id = ").push_bind(*id).push(" THEN 1 ");
        }
        builder
            .push("WHEN CAST(p.id AS TEXT) LIKE ")
            .push_bind(term.like_pattern())
            .push(r" ESCAPE '\' THEN 2 ELSE 3 END, ");
    } else if let Some(sort) = query.effective_sort() {
        builder.push(sort_column(sort.key)).push(match sort.order {
            SortOrder::Asc => " ASC, ",
            SortOrder::Desc => " DESC, ",
        });
    }

    builder.push("p.id ASC");
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn map_category_insert_error(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_foreign_key_violation()
    {
        return RepositoryError::InvalidReference("category".to_owned());
    }
    RepositoryError::Database(e)
}

async fn fetch_product<'e, E>(executor: E, id: i32) -> Result<Option<Product>, RepositoryError>
where
    E: sqlx::PgExecutor<'e>,
{
    let sql = format!("{PRODUCT_SELECT} WHERE p.id = $1");
    let row = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    row.map(Product::try_from).transpose()
}

async fn category_exists<'e, E>(executor: E, id: CategoryId) -> Result<bool, RepositoryError>
where
    E: sqlx::PgExecutor<'e>,
{
    let found: Option<i32> = sqlx::query_scalar("SELECT id FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(found.is_some())
}

#[async_trait]
impl CatalogStore for PgCatalogRepository {
    async fn health_check(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, (CategoryId, String)>(
            "SELECT id, name FROM categories ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name)| Category { id, name })
            .collect())
    }

    async fn ensure_categories(&self, names: &[String]) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for name in names {
            let result = sqlx::query(
                "INSERT INTO categories (name) VALUES ($1) ON CONFLICT (name) DO NOTHING",
            )
            .bind(name)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn create_category(&self, name: &str) -> Result<Category, RepositoryError> {
        let (id, name) = sqlx::query_as::<_, (CategoryId, String)>(
            "INSERT INTO categories (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("name".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        Ok(Category { id, name })
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_foreign_key_violation()
                {
                    return RepositoryError::Conflict("products".to_owned());
                }
                RepositoryError::Database(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        fetch_product(&self.pool, id.as_i32()).await
    }

    async fn search_products(&self, query: &ProductQuery) -> Result<ProductPage, RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products p");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let window = query.page.window(u64::try_from(total).unwrap_or(0));

        let mut select = QueryBuilder::<Postgres>::new(PRODUCT_SELECT);
        push_filters(&mut select, query);
        push_ordering(&mut select, query);
        select
            .push(" LIMIT ")
            .push_bind(to_i64(window.limit))
            .push(" OFFSET ")
            .push_bind(to_i64(window.offset()));

        tracing::debug!(sql = select.sql(), "product search");

        let rows = select
            .build_query_as::<ProductRow>()
            .fetch_all(&self.pool)
            .await?;
        let products = rows
            .into_iter()
            .map(Product::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ProductPage { products, window })
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if let Some(category_id) = product.category_id
            && !category_exists(&mut *tx, category_id).await?
        {
            return Err(RepositoryError::InvalidReference("category".to_owned()));
        }

        let id: i32 = sqlx::query_scalar(
            "INSERT INTO products (name, price, description, image_url, in_stock, category_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id",
        )
        .bind(&product.name)
        .bind(product.price)
        .bind(&product.description)
        .bind(&product.image_url)
        .bind(product.in_stock)
        .bind(product.category_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_category_insert_error)?;

        let created = fetch_product(&mut *tx, id)
            .await?
            .ok_or_else(|| RepositoryError::DataCorruption(format!("product {id} vanished")))?;

        tx.commit().await?;
        Ok(created)
    }

    async fn update_product(
        &self,
        id: ProductId,
        changes: ProductChanges,
    ) -> Result<Product, RepositoryError> {
        if changes.is_empty() {
            return fetch_product(&self.pool, id.as_i32())
                .await?
                .ok_or(RepositoryError::NotFound);
        }

        let mut tx = self.pool.begin().await?;

        if let Some(Some(category_id)) = changes.category_id
            && !category_exists(&mut *tx, category_id).await?
        {
            return Err(RepositoryError::InvalidReference("category".to_owned()));
        }

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE products SET updated_at = NOW()");
        if let Some(name) = changes.name {
            builder.push(", name = ").push_bind(name);
        }
        if let Some(price) = changes.price {
            builder.push(", price = ").push_bind(price);
        }
        if let Some(description) = changes.description {
            builder.push(", description = ").push_bind(description);
        }
        if let Some(image_url) = changes.image_url {
            builder.push(", image_url = ").push_bind(image_url);
        }
        if let Some(in_stock) = changes.in_stock {
            builder.push(", in_stock = ").push_bind(in_stock);
        }
        if let Some(category_id) = changes.category_id {
            builder.push(", category_id = ").push_bind(category_id);
        }
        builder.push(" WHERE id = ").push_bind(id).push(" RETURNING id");

        let updated: Option<i32> = builder
            .build_query_scalar()
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_category_insert_error)?;
        let updated = updated.ok_or(RepositoryError::NotFound)?;

        let product = fetch_product(&mut *tx, updated)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        Ok(product)
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }
}
