//! Product listing, detail and mutation endpoints.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;

use axum::http::{Method, StatusCode};
use chrono::{TimeZone, Utc};
use marketplace_integration_tests::{TestApp, product_ids};
use serde_json::json;

fn day(d: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, d, 12, 0, 0).unwrap()
}

// =============================================================================
// Listing
// =============================================================================

#[tokio::test]
async fn test_empty_body_lists_everything() {
    let app = TestApp::new();
    for id in 1..=3 {
        app.insert_product(id, &format!("Item {id}"), 10, None, day(1)).await;
    }

    let res = app
        .request(Method::POST, "/api/products/get-products", None, None)
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(product_ids(&res.body), [1, 2, 3]);
    assert_eq!(res.body["total"], 3);
    assert_eq!(res.body["pages"], 1);
    assert_eq!(res.body["current_page"], 1);
}

#[tokio::test]
async fn test_pages_cover_the_set_exactly_once() {
    let app = TestApp::new();
    for id in 1..=23 {
        app.insert_product(id, &format!("Item {id}"), i64::from(id), None, day(1))
            .await;
    }

    for limit in [1, 4, 5, 10, 23, 50] {
        let first = app
            .post(
                &format!("/api/products/get-products?page=1&limit={limit}"),
                None,
                json!({}),
            )
            .await;
        let pages = first.body["pages"].as_u64().unwrap();
        assert_eq!(pages, 23_u64.div_ceil(limit));

        let mut seen = Vec::new();
        for page in 1..=pages {
            let res = app
                .post(
                    &format!("/api/products/get-products?page={page}&limit={limit}"),
                    None,
                    json!({ "sort_by": "price", "sort_order": "desc" }),
                )
                .await;
            seen.extend(product_ids(&res.body));
        }

        assert_eq!(seen.len(), 23, "limit {limit}");
        let unique: BTreeSet<_> = seen.iter().copied().collect();
        assert_eq!(unique.len(), 23, "limit {limit}");
        assert_eq!(seen.first(), Some(&23));
    }
}

#[tokio::test]
async fn test_page_past_the_end_returns_last_page() {
    let app = TestApp::new();
    for id in 1..=7 {
        app.insert_product(id, &format!("Item {id}"), 10, None, day(1)).await;
    }

    let res = app
        .post("/api/products/get-products?page=99&limit=3", None, json!({}))
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["current_page"], 3);
    assert_eq!(res.body["pages"], 3);
    assert_eq!(product_ids(&res.body), [7]);
}

#[tokio::test]
async fn test_per_page_alias_and_bad_params_fall_back() {
    let app = TestApp::new();
    for id in 1..=12 {
        app.insert_product(id, &format!("Item {id}"), 10, None, day(1)).await;
    }

    let aliased = app
        .post("/api/products/get-products?per_page=4", None, json!({}))
        .await;
    assert_eq!(aliased.body["pages"], 3);

    let junk = app
        .post("/api/products/get-products?page=x&limit=0", None, json!({}))
        .await;
    assert_eq!(junk.status, StatusCode::OK);
    assert_eq!(junk.body["current_page"], 1);
    assert_eq!(product_ids(&junk.body).len(), 10);
}

#[tokio::test]
async fn test_single_digit_search_is_ignored_so_id_five_leads() {
    let app = TestApp::new();
    for id in [105, 50, 15, 5] {
        app.insert_product(id, &format!("Gadget {id}"), 10, None, day(1)).await;
    }

    let res = app
        .post("/api/products/get-products", None, json!({ "search_query": "5" }))
        .await;

    assert_eq!(product_ids(&res.body), [5, 15, 50, 105]);
}

#[tokio::test]
async fn test_numeric_search_ranks_exact_then_partial_then_name() {
    let app = TestApp::new();
    for id in [5, 15, 50, 105, 115] {
        app.insert_product(id, &format!("Gadget {id:03}x"), 10, None, day(1))
            .await;
    }
    app.insert_product(3, "Model 15", 10, None, day(1)).await;

    let res = app
        .post(
            "/api/products/get-products",
            None,
            json!({ "search_query": " 15 ", "sort_by": "name", "sort_order": "desc" }),
        )
        .await;

    assert_eq!(product_ids(&res.body), [15, 115, 3]);
}

#[tokio::test]
async fn test_text_search_is_case_insensitive() {
    let app = TestApp::new();
    app.insert_product(1, "Blue Phone", 10, None, day(1)).await;
    app.insert_product(2, "Laptop", 10, None, day(1)).await;
    app.insert_product(3, "PHONE case", 10, None, day(1)).await;

    let res = app
        .post("/api/products/get-products", None, json!({ "search_query": "phone" }))
        .await;

    assert_eq!(product_ids(&res.body), [1, 3]);
}

#[tokio::test]
async fn test_filters_combine() {
    let app = TestApp::new();
    app.insert_product(1, "Cheap old", 5, None, day(1)).await;
    app.insert_product(2, "Mid new", 50, None, day(5)).await;
    app.insert_product(3, "Pricey new", 500, None, day(5)).await;
    app.insert_product(4, "Mid old", 60, None, day(1)).await;

    let res = app
        .post(
            "/api/products/get-products",
            None,
            json!({ "min_price": 10, "max_price": "100", "created_from": "2024-01-03" }),
        )
        .await;
    assert_eq!(product_ids(&res.body), [2]);

    let res = app
        .post(
            "/api/products/get-products",
            None,
            json!({ "created_to": "2024-01-02T00:00:00Z", "sort_by": "price", "sort_order": "desc" }),
        )
        .await;
    assert_eq!(product_ids(&res.body), [4, 1]);
}

#[tokio::test]
async fn test_unknown_sort_key_is_ignored_and_bad_date_rejected() {
    let app = TestApp::new();
    app.insert_product(2, "B", 10, None, day(1)).await;
    app.insert_product(1, "A", 20, None, day(1)).await;

    let res = app
        .post("/api/products/get-products", None, json!({ "sort_by": "password" }))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(product_ids(&res.body), [1, 2]);

    let bad = app
        .post("/api/products/get-products", None, json!({ "created_from": "yesterday" }))
        .await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
    assert!(bad.body["msg"].is_string());
}

// =============================================================================
// Detail and mutations
// =============================================================================

#[tokio::test]
async fn test_create_with_category_then_fetch() {
    let app = TestApp::new();
    let admin = app.admin_token("admin@example.com").await;
    let category = app
        .post("/api/products/categories", Some(&admin), json!({ "name": "Electronics" }))
        .await;
    let category_id = category.body["category"]["id"].as_i64().unwrap();

    let created = app
        .post(
            "/api/products/create",
            Some(&admin),
            json!({
                "name": "Phone",
                "price": 500,
                "description": "A phone",
                "category_id": category_id,
            }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{:?}", created.body);
    let product = &created.body["product"];
    assert_eq!(product["in_stock"], true);
    assert_eq!(product["category"]["name"], "Electronics");
    assert!((product["price"].as_f64().unwrap() - 500.0).abs() < f64::EPSILON);

    let id = product["id"].as_i64().unwrap();
    let fetched = app.get(&format!("/api/products/{id}"), None).await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.body["product"], *product);
}

#[tokio::test]
async fn test_create_with_unknown_category_writes_nothing() {
    let app = TestApp::new();
    let admin = app.admin_token("admin@example.com").await;

    let res = app
        .post(
            "/api/products/create",
            Some(&admin),
            json!({ "name": "Phone", "price": 500, "category_id": 999 }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let list = app.post("/api/products/get-products", None, json!({})).await;
    assert_eq!(list.body["total"], 0);
}

#[tokio::test]
async fn test_create_requires_name_and_valid_price() {
    let app = TestApp::new();
    let admin = app.admin_token("admin@example.com").await;

    for body in [
        json!({ "price": 5 }),
        json!({ "name": "  ", "price": 5 }),
        json!({ "name": "X" }),
        json!({ "name": "X", "price": -1 }),
    ] {
        let res = app.post("/api/products/create", Some(&admin), body).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_partial_update() {
    let app = TestApp::new();
    let admin = app.admin_token("admin@example.com").await;
    let category = app
        .post("/api/products/categories", Some(&admin), json!({ "name": "Books" }))
        .await;
    let category_id = category.body["category"]["id"].as_i64().unwrap();
    let created = app
        .post(
            "/api/products/create",
            Some(&admin),
            json!({ "name": "Novel", "price": 20, "description": "Long", "category_id": category_id }),
        )
        .await;
    let id = created.body["product"]["id"].as_i64().unwrap();

    let res = app
        .put(
            &format!("/api/products/{id}"),
            Some(&admin),
            json!({ "price": 12.5, "category_id": null, "in_stock": false }),
        )
        .await;

    assert_eq!(res.status, StatusCode::OK, "{:?}", res.body);
    let product = &res.body["product"];
    assert_eq!(product["name"], "Novel");
    assert_eq!(product["description"], "Long");
    assert!(product["category"].is_null());
    assert_eq!(product["in_stock"], false);
    assert!((product["price"].as_f64().unwrap() - 12.5).abs() < f64::EPSILON);

    let bad_category = app
        .put(&format!("/api/products/{id}"), Some(&admin), json!({ "category_id": 999 }))
        .await;
    assert_eq!(bad_category.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_products_are_not_found() {
    let app = TestApp::new();
    let admin = app.admin_token("admin@example.com").await;

    assert_eq!(app.get("/api/products/42", None).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.get("/api/products/abc", None).await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        app.put("/api/products/42", Some(&admin), json!({ "name": "x" })).await.status,
        StatusCode::NOT_FOUND
    );

    let res = app.delete("/api/products/42", Some(&admin)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert!(res.body["msg"].is_string());
}

#[tokio::test]
async fn test_delete_product() {
    let app = TestApp::new();
    let admin = app.admin_token("admin@example.com").await;
    app.insert_product(9, "Doomed", 1, None, day(1)).await;

    let res = app.delete("/api/products/9", Some(&admin)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body["msg"].is_string());

    assert_eq!(app.get("/api/products/9", None).await.status, StatusCode::NOT_FOUND);
}
