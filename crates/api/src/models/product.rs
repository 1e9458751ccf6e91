//! Catalog domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use marketplace_core::{CategoryId, PageWindow, Price, ProductId};

/// A product category.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// A product with its category joined in.
///
/// Field order is the JSON field order.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub in_stock: bool,
}

/// A validated product ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub price: Price,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub in_stock: bool,
    pub category_id: Option<CategoryId>,
}

/// A validated partial update.
///
/// `None` leaves a field untouched. For nullable columns `Some(None)` clears
/// the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub price: Option<Price>,
    pub description: Option<Option<String>>,
    pub image_url: Option<Option<String>>,
    pub in_stock: Option<bool>,
    pub category_id: Option<Option<CategoryId>>,
}

impl ProductChanges {
    /// Whether the update would leave every field untouched.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.price.is_none()
            && self.description.is_none()
            && self.image_url.is_none()
            && self.in_stock.is_none()
            && self.category_id.is_none()
    }
}

/// One page of a product listing.
#[derive(Debug, Clone)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub window: PageWindow,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_product_json_shape() {
        let ts = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let product = Product {
            id: ProductId::new(3),
            name: "Phone".to_string(),
            price: Price::new(Decimal::from(500)).unwrap(),
            description: None,
            category: Some(Category {
                id: CategoryId::new(1),
                name: "Electronics".to_string(),
            }),
            image_url: None,
            created_at: ts,
            updated_at: ts,
            in_stock: true,
        };

        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["price"], serde_json::json!(500.0));
        assert_eq!(json["category"]["name"], "Electronics");
        assert!(json["description"].is_null());
        assert_eq!(json["in_stock"], true);
    }

    #[test]
    fn test_empty_changes() {
        assert!(ProductChanges::default().is_empty());
        let changes = ProductChanges {
            description: Some(None),
            ..ProductChanges::default()
        };
        assert!(!changes.is_empty());
    }
}
