//! Integration tests for the order placement flow.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The API server running (cargo run -p maktaba-api)
//!
//! Run with: cargo test -p maktaba-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::expect_used)]

use reqwest::StatusCode;
use serde_json::Value;

use maktaba_integration_tests::{TestContext, checkout_body};

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_guest_checkout_computes_totals() {
    let ctx = TestContext::new().await;
    // price 100, discount 20 -> final price 80; qty 2 -> subtotal 160,
    // shipping 30 (below the 500 threshold), tax 32, total 222.
    let book_id = ctx.seed_book("Totals Book", "100.00", Some("20.00"), 10).await;

    let resp = ctx
        .client
        .post(ctx.url("/api/orders"))
        .json(&checkout_body(book_id, 2))
        .send()
        .await
        .expect("checkout request failed");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let order: Value = resp.json().await.unwrap();
    assert_eq!(order["subtotal"], "160.00");
    assert_eq!(order["shipping_amount"], "30.00");
    assert_eq!(order["tax_amount"], "32.00");
    assert_eq!(order["discount_amount"], "0.00");
    assert_eq!(order["total_amount"], "222.00");
    assert_eq!(order["status"], "pending");
    assert_eq!(order["payment_status"], "pending");
    assert!(order["order_number"].as_str().unwrap().starts_with("ORD-"));
    assert_eq!(order["items"][0]["quantity"], 2);
    assert_eq!(order["items"][0]["unit_price"], "80.00");
    assert_eq!(order["items"][0]["total_price"], "160.00");

    // Stock decremented, sales incremented.
    let (stock, sales) = ctx.book_counters(book_id).await;
    assert_eq!(stock, 8);
    assert_eq!(sales, 2);

    ctx.cleanup_book(book_id).await;
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_unit_price_is_a_snapshot() {
    let ctx = TestContext::new().await;
    let book_id = ctx.seed_book("Snapshot Book", "50.00", None, 5).await;

    let resp = ctx
        .client
        .post(ctx.url("/api/orders"))
        .json(&checkout_body(book_id, 1))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order: Value = resp.json().await.unwrap();
    let order_id = order["id"].as_i64().unwrap();

    // Raise the book's price after the order was placed.
    sqlx::query("UPDATE store.books SET price = 99.99 WHERE id = $1")
        .bind(book_id)
        .execute(&ctx.pool)
        .await
        .unwrap();

    // The stored item keeps the price from order time.
    let stored: (String,) = sqlx::query_as(
        "SELECT unit_price::text FROM store.order_items WHERE order_id = $1",
    )
    .bind(order_id)
    .fetch_one(&ctx.pool)
    .await
    .unwrap();
    assert_eq!(stored.0, "50.00");

    ctx.cleanup_book(book_id).await;
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_insufficient_stock_is_rejected_atomically() {
    let ctx = TestContext::new().await;
    let book_id = ctx.seed_book("Scarce Book", "40.00", None, 1).await;

    let resp = ctx
        .client
        .post(ctx.url("/api/orders"))
        .json(&checkout_body(book_id, 3))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // Nothing was written: counters untouched, no orphan order rows.
    let (stock, sales) = ctx.book_counters(book_id).await;
    assert_eq!((stock, sales), (1, 0));
    let orphan_items: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM store.order_items WHERE book_id = $1")
            .bind(book_id)
            .fetch_one(&ctx.pool)
            .await
            .unwrap();
    assert_eq!(orphan_items, 0);

    ctx.cleanup_book(book_id).await;
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_unknown_book_is_not_found() {
    let ctx = TestContext::new().await;

    let resp = ctx
        .client
        .post(ctx.url("/api/orders"))
        .json(&checkout_body(999_999_999, 1))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_zero_quantity_is_rejected() {
    let ctx = TestContext::new().await;
    let book_id = ctx.seed_book("Zero Qty Book", "25.00", None, 5).await;

    let resp = ctx
        .client
        .post(ctx.url("/api/orders"))
        .json(&checkout_body(book_id, 0))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    ctx.cleanup_book(book_id).await;
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_cancellation_restores_counters() {
    let ctx = TestContext::new().await;
    let book_id = ctx.seed_book("Cancel Book", "60.00", None, 10).await;

    // Register so the order is owned and cancellable through the API.
    let email = format!("cancel-{}@example.com", std::process::id());
    let resp = ctx
        .client
        .post(ctx.url("/api/register"))
        .json(&serde_json::json!({
            "name": "Cancel Tester",
            "email": email,
            "password": "a strong password",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = ctx
        .client
        .post(ctx.url("/api/orders"))
        .json(&checkout_body(book_id, 3))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order: Value = resp.json().await.unwrap();
    let order_id = order["id"].as_i64().unwrap();

    let (stock, sales) = ctx.book_counters(book_id).await;
    assert_eq!((stock, sales), (7, 3));

    let resp = ctx
        .client
        .put(ctx.url(&format!("/api/orders/{order_id}/cancel")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let cancelled: Value = resp.json().await.unwrap();
    assert_eq!(cancelled["status"], "cancelled");

    // Stock restored (7 + 3 = 10), sales rolled back.
    let (stock, sales) = ctx.book_counters(book_id).await;
    assert_eq!((stock, sales), (10, 0));

    ctx.cleanup_book(book_id).await;
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_cancel_shipped_order_conflicts() {
    let ctx = TestContext::new().await;
    let book_id = ctx.seed_book("Shipped Book", "70.00", None, 10).await;

    let email = format!("shipped-{}@example.com", std::process::id());
    ctx.client
        .post(ctx.url("/api/register"))
        .json(&serde_json::json!({
            "name": "Shipped Tester",
            "email": email,
            "password": "a strong password",
        }))
        .send()
        .await
        .unwrap();

    let resp = ctx
        .client
        .post(ctx.url("/api/orders"))
        .json(&checkout_body(book_id, 1))
        .send()
        .await
        .unwrap();
    let order: Value = resp.json().await.unwrap();
    let order_id = order["id"].as_i64().unwrap();

    ctx.force_order_status(order_id, "shipped").await;

    let resp = ctx
        .client
        .put(ctx.url(&format!("/api/orders/{order_id}/cancel")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // No counter movement from the refused cancellation.
    let (stock, sales) = ctx.book_counters(book_id).await;
    assert_eq!((stock, sales), (9, 1));

    ctx.cleanup_book(book_id).await;
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_concurrent_checkout_of_last_copy() {
    let ctx = TestContext::new().await;
    let book_id = ctx.seed_book("Last Copy", "90.00", None, 1).await;

    // Two simultaneous orders for the single remaining copy: the row lock
    // serializes them, so exactly one succeeds.
    let first = ctx
        .client
        .post(ctx.url("/api/orders"))
        .json(&checkout_body(book_id, 1))
        .send();
    let second = ctx
        .client
        .post(ctx.url("/api/orders"))
        .json(&checkout_body(book_id, 1))
        .send();

    let (first, second) = tokio::join!(first, second);
    let statuses = [first.unwrap().status(), second.unwrap().status()];

    let created = statuses.iter().filter(|s| **s == StatusCode::CREATED).count();
    let conflicted = statuses.iter().filter(|s| **s == StatusCode::CONFLICT).count();
    assert_eq!((created, conflicted), (1, 1), "statuses: {statuses:?}");

    let (stock, sales) = ctx.book_counters(book_id).await;
    assert_eq!((stock, sales), (0, 1));

    ctx.cleanup_book(book_id).await;
}
