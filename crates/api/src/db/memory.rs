//! In-process implementation of the repository traits.
//!
//! Applies the same matching, ordering and paging rules as the `PostgreSQL`
//! repositories, so handlers and services can be exercised without a
//! database. Available to other crates behind the `test-utils` feature.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use marketplace_core::{
    CategoryId, Email, HashedPassword, MatchTier, Price, ProductId, ProductQuery, Role, SortKey,
    SortOrder, UserId,
};

use super::{CatalogStore, RepositoryError, UserStore};
use crate::models::{
    Category, NewProduct, NewUser, Product, ProductChanges, ProductPage, User,
};

#[derive(Debug, Clone)]
struct ProductRecord {
    id: ProductId,
    name: String,
    price: Price,
    description: Option<String>,
    image_url: Option<String>,
    in_stock: bool,
    category_id: Option<CategoryId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    users: BTreeMap<UserId, User>,
    categories: BTreeMap<CategoryId, String>,
    products: BTreeMap<ProductId, ProductRecord>,
    next_user_id: i32,
    next_category_id: i32,
    next_product_id: i32,
}

impl State {
    fn category(&self, id: Option<CategoryId>) -> Option<Category> {
        let id = id?;
        self.categories.get(&id).map(|name| Category {
            id,
            name: name.clone(),
        })
    }

    fn product(&self, record: &ProductRecord) -> Product {
        Product {
            id: record.id,
            name: record.name.clone(),
            price: record.price,
            description: record.description.clone(),
            category: self.category(record.category_id),
            image_url: record.image_url.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            in_stock: record.in_stock,
        }
    }

    fn category_name(&self, record: &ProductRecord) -> Option<&str> {
        record
            .category_id
            .and_then(|id| self.categories.get(&id))
            .map(String::as_str)
    }

    fn check_category(&self, id: Option<CategoryId>) -> Result<(), RepositoryError> {
        match id {
            Some(id) if !self.categories.contains_key(&id) => {
                Err(RepositoryError::InvalidReference("category".to_owned()))
            }
            _ => Ok(()),
        }
    }
}

/// Thread-safe in-memory user and catalog store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a product with an explicit ID and creation time.
    ///
    /// Lets tests build fixtures such as specific ID sets or date ranges.
    /// Later inserts without an ID continue after the highest ID seen.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict("id")` if the ID is taken and
    /// `RepositoryError::InvalidReference("category")` for an unknown category.
    pub async fn insert_product_at(
        &self,
        id: ProductId,
        product: NewProduct,
        created_at: DateTime<Utc>,
    ) -> Result<Product, RepositoryError> {
        let mut state = self.state.write().await;
        if state.products.contains_key(&id) {
            return Err(RepositoryError::Conflict("id".to_owned()));
        }
        insert_record(&mut state, id, product, created_at)
    }
}

fn insert_record(
    state: &mut State,
    id: ProductId,
    product: NewProduct,
    created_at: DateTime<Utc>,
) -> Result<Product, RepositoryError> {
    state.check_category(product.category_id)?;

    let record = ProductRecord {
        id,
        name: product.name,
        price: product.price,
        description: product.description,
        image_url: product.image_url,
        in_stock: product.in_stock,
        category_id: product.category_id,
        created_at,
        updated_at: created_at,
    };
    state.next_product_id = state.next_product_id.max(id.as_i32());
    let created = state.product(&record);
    state.products.insert(id, record);
    Ok(created)
}

/// Compare two nullable sort values with NULL sorting after any value.
fn cmp_nulls_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_by(state: &State, key: SortKey, a: &ProductRecord, b: &ProductRecord) -> Ordering {
    match key {
        SortKey::Id => a.id.cmp(&b.id),
        SortKey::Name => a.name.cmp(&b.name),
        SortKey::Price => a.price.cmp(&b.price),
        SortKey::Description => cmp_nulls_last(a.description.as_ref(), b.description.as_ref()),
        SortKey::ImageUrl => cmp_nulls_last(a.image_url.as_ref(), b.image_url.as_ref()),
        SortKey::InStock => a.in_stock.cmp(&b.in_stock),
        SortKey::CategoryId => cmp_nulls_last(a.category_id, b.category_id),
        SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        SortKey::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortKey::CategoryName => cmp_nulls_last(state.category_name(a), state.category_name(b)),
    }
}

fn matches_filters(query: &ProductQuery, record: &ProductRecord) -> bool {
    query.min_price.is_none_or(|min| record.price.amount() >= min)
        && query.max_price.is_none_or(|max| record.price.amount() <= max)
        && query
            .category_id
            .is_none_or(|id| record.category_id == Some(id))
        && query.in_stock.is_none_or(|flag| record.in_stock == flag)
        && query.created_from.is_none_or(|from| record.created_at >= from)
        && query.created_to.is_none_or(|to| record.created_at <= to)
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict("email".to_owned()));
        }
        if state.users.values().any(|u| u.username == user.username) {
            return Err(RepositoryError::Conflict("username".to_owned()));
        }

        state.next_user_id += 1;
        let now = Utc::now();
        let created = User {
            id: UserId::new(state.next_user_id),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| &u.email == email).cloned())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).cloned())
    }

    async fn set_role(&self, id: UserId, role: Role) -> Result<User, RepositoryError> {
        let mut state = self.state.write().await;
        let user = state.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        user.role = role;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn health_check(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .categories
            .iter()
            .map(|(id, name)| Category {
                id: *id,
                name: name.clone(),
            })
            .collect())
    }

    async fn ensure_categories(&self, names: &[String]) -> Result<u64, RepositoryError> {
        let mut state = self.state.write().await;
        let mut inserted = 0;
        for name in names {
            if state.categories.values().any(|existing| existing == name) {
                continue;
            }
            state.next_category_id += 1;
            let id = CategoryId::new(state.next_category_id);
            state.categories.insert(id, name.clone());
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn create_category(&self, name: &str) -> Result<Category, RepositoryError> {
        let mut state = self.state.write().await;
        if state.categories.values().any(|existing| existing == name) {
            return Err(RepositoryError::Conflict("name".to_owned()));
        }
        state.next_category_id += 1;
        let id = CategoryId::new(state.next_category_id);
        state.categories.insert(id, name.to_owned());
        Ok(Category {
            id,
            name: name.to_owned(),
        })
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        if !state.categories.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        if state.products.values().any(|p| p.category_id == Some(id)) {
            return Err(RepositoryError::Conflict("products".to_owned()));
        }
        state.categories.remove(&id);
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.products.get(&id).map(|record| state.product(record)))
    }

    async fn search_products(&self, query: &ProductQuery) -> Result<ProductPage, RepositoryError> {
        let state = self.state.read().await;

        let mut matched: Vec<(Option<MatchTier>, &ProductRecord)> = state
            .products
            .values()
            .filter(|record| matches_filters(query, record))
            .filter_map(|record| match &query.search {
                Some(term) => term.rank(record.id, &record.name).map(|t| (Some(t), record)),
                None => Some((None, record)),
            })
            .collect();

        if query.ranks_by_search() {
            matched.sort_by(|(ta, a), (tb, b)| ta.cmp(tb).then(a.id.cmp(&b.id)));
        } else if let Some(sort) = query.effective_sort() {
            matched.sort_by(|(_, a), (_, b)| {
                let ord = compare_by(&state, sort.key, a, b);
                let ord = match sort.order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                };
                ord.then(a.id.cmp(&b.id))
            });
        } else {
            matched.sort_by(|(_, a), (_, b)| a.id.cmp(&b.id));
        }

        let window = query
            .page
            .window(u64::try_from(matched.len()).unwrap_or(u64::MAX));
        let offset = usize::try_from(window.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(window.limit).unwrap_or(usize::MAX);
        let products = matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(_, record)| state.product(record))
            .collect();

        Ok(ProductPage { products, window })
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let mut state = self.state.write().await;
        let id = ProductId::new(state.next_product_id + 1);
        insert_record(&mut state, id, product, Utc::now())
    }

    async fn update_product(
        &self,
        id: ProductId,
        changes: ProductChanges,
    ) -> Result<Product, RepositoryError> {
        let mut state = self.state.write().await;
        if !state.products.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        if changes.is_empty() {
            let record = state.products.get(&id).cloned().ok_or(RepositoryError::NotFound)?;
            return Ok(state.product(&record));
        }
        if let Some(category_id) = changes.category_id {
            state.check_category(category_id)?;
        }

        let Some(record) = state.products.get_mut(&id) else {
            return Err(RepositoryError::NotFound);
        };
        if let Some(name) = changes.name {
            record.name = name;
        }
        if let Some(price) = changes.price {
            record.price = price;
        }
        if let Some(description) = changes.description {
            record.description = description;
        }
        if let Some(image_url) = changes.image_url {
            record.image_url = image_url;
        }
        if let Some(in_stock) = changes.in_stock {
            record.in_stock = in_stock;
        }
        if let Some(category_id) = changes.category_id {
            record.category_id = category_id;
        }
        record.updated_at = Utc::now();

        let record = record.clone();
        Ok(state.product(&record))
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        state
            .products
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

/// A password hash placeholder for fixtures that never log in.
#[must_use]
pub fn unusable_password_hash() -> HashedPassword {
    HashedPassword::from_phc("!unusable".to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use marketplace_core::{PageRequest, ProductFilter};
    use rust_decimal::Decimal;

    use super::*;

    fn new_product(name: &str, price: i64, category_id: Option<CategoryId>) -> NewProduct {
        NewProduct {
            name: name.to_owned(),
            price: Price::new(Decimal::from(price)).unwrap(),
            description: None,
            image_url: None,
            in_stock: true,
            category_id,
        }
    }

    fn query(filter: ProductFilter, page: i64, limit: i64) -> ProductQuery {
        filter
            .into_query(PageRequest::new(Some(page), Some(limit)))
            .unwrap()
    }

    fn ids(page: &ProductPage) -> Vec<i32> {
        page.products.iter().map(|p| p.id.as_i32()).collect()
    }

    #[tokio::test]
    async fn test_numeric_search_priority() {
        let store = MemoryStore::new();
        for id in [5, 15, 50, 105, 7] {
            store
                .insert_product_at(ProductId::new(id), new_product("Widget", 1, None), Utc::now())
                .await
                .unwrap();
        }
        store
            .insert_product_at(ProductId::new(3), new_product("Model 15", 1, None), Utc::now())
            .await
            .unwrap();

        let page = store
            .search_products(&query(
                ProductFilter {
                    search_query: Some("15".into()),
                    sort_by: Some("name".into()),
                    sort_order: Some("desc".into()),
                    ..ProductFilter::default()
                },
                1,
                10,
            ))
            .await
            .unwrap();

        assert_eq!(ids(&page), vec![15, 3]);
        assert_eq!(page.window.total, 2);
    }

    #[tokio::test]
    async fn test_sort_desc_puts_null_categories_first() {
        let store = MemoryStore::new();
        store
            .ensure_categories(&["Books".to_owned(), "Art".to_owned()])
            .await
            .unwrap();
        let books = CategoryId::new(1);
        let art = CategoryId::new(2);
        store.create_product(new_product("a", 1, Some(books))).await.unwrap();
        store.create_product(new_product("b", 1, None)).await.unwrap();
        store.create_product(new_product("c", 1, Some(art))).await.unwrap();

        let filter = |order: &str| ProductFilter {
            sort_by: Some("category_name".into()),
            sort_order: Some(order.into()),
            ..ProductFilter::default()
        };

        let asc = store.search_products(&query(filter("asc"), 1, 10)).await.unwrap();
        assert_eq!(ids(&asc), vec![3, 1, 2]);

        let desc = store.search_products(&query(filter("desc"), 1, 10)).await.unwrap();
        assert_eq!(ids(&desc), vec![2, 1, 3]);
    }

    #[tokio::test]
    async fn test_pages_are_disjoint_and_complete() {
        let store = MemoryStore::new();
        for i in 0..23 {
            store
                .create_product(new_product(&format!("item {i}"), i % 4, None))
                .await
                .unwrap();
        }

        let sorted = |page| {
            query(
                ProductFilter {
                    sort_by: Some("price".into()),
                    ..ProductFilter::default()
                },
                page,
                5,
            )
        };

        let first = store.search_products(&sorted(1)).await.unwrap();
        assert_eq!(first.window.pages, 5);

        let mut seen = Vec::new();
        for page in 1..=5 {
            seen.extend(ids(&store.search_products(&sorted(page)).await.unwrap()));
        }
        let mut unique = seen.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(seen.len(), 23);
        assert_eq!(unique.len(), 23);

        let clamped = store.search_products(&sorted(99)).await.unwrap();
        assert_eq!(clamped.window.page, 5);
        assert_eq!(clamped.products.len(), 3);
    }

    #[tokio::test]
    async fn test_price_and_stock_filters() {
        let store = MemoryStore::new();
        store.create_product(new_product("cheap", 5, None)).await.unwrap();
        store.create_product(new_product("mid", 50, None)).await.unwrap();
        let mut pricey = new_product("pricey", 500, None);
        pricey.in_stock = false;
        store.create_product(pricey).await.unwrap();

        let page = store
            .search_products(&query(
                ProductFilter {
                    min_price: Some(Decimal::from(5)),
                    max_price: Some(Decimal::from(500)),
                    in_stock: Some(true),
                    ..ProductFilter::default()
                },
                1,
                10,
            ))
            .await
            .unwrap();
        assert_eq!(ids(&page), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_delete_category_in_use_is_conflict() {
        let store = MemoryStore::new();
        let category = store.create_category("Home").await.unwrap();
        store
            .create_product(new_product("Lamp", 20, Some(category.id)))
            .await
            .unwrap();

        assert!(matches!(
            store.delete_category(category.id).await,
            Err(RepositoryError::Conflict(_))
        ));
        assert!(matches!(
            store.delete_category(CategoryId::new(999)).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_empty_update_leaves_updated_at() {
        let store = MemoryStore::new();
        let created_at = Utc::now() - chrono::Duration::days(3);
        let product = store
            .insert_product_at(ProductId::new(4), new_product("Lamp", 30, None), created_at)
            .await
            .unwrap();

        let unchanged = store
            .update_product(product.id, ProductChanges::default())
            .await
            .unwrap();
        assert_eq!(unchanged, product);
        assert_eq!(unchanged.updated_at, created_at);

        let renamed = store
            .update_product(
                product.id,
                ProductChanges {
                    name: Some("Desk lamp".into()),
                    ..ProductChanges::default()
                },
            )
            .await
            .unwrap();
        assert!(renamed.updated_at > created_at);

        assert!(matches!(
            store
                .update_product(ProductId::new(99), ProductChanges::default())
                .await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_create_with_unknown_category_writes_nothing() {
        let store = MemoryStore::new();
        let result = store
            .create_product(new_product("Ghost", 1, Some(CategoryId::new(42))))
            .await;
        assert!(matches!(result, Err(RepositoryError::InvalidReference(_))));

        let all = store
            .search_products(&query(ProductFilter::default(), 1, 10))
            .await
            .unwrap();
        assert_eq!(all.window.total, 0);

        let next = store.create_product(new_product("Real", 1, None)).await.unwrap();
        assert_eq!(next.id, ProductId::new(1));
    }

    #[tokio::test]
    async fn test_user_uniqueness() {
        let store = MemoryStore::new();
        let user = |name: &str, email: &str| NewUser {
            username: name.to_owned(),
            email: Email::parse(email).unwrap(),
            password_hash: unusable_password_hash(),
            role: Role::Buyer,
        };

        store.create_user(user("ann", "ann@example.com")).await.unwrap();
        assert!(matches!(
            store.create_user(user("other", "ann@example.com")).await,
            Err(RepositoryError::Conflict(field)) if field == "email"
        ));
        assert!(matches!(
            store.create_user(user("ann", "ann2@example.com")).await,
            Err(RepositoryError::Conflict(field)) if field == "username"
        ));
    }
}
