//! Integration tests for Maktaba.
//!
//! # Running Tests
//!
//! ```bash
//! # Start PostgreSQL, run migrations and the server:
//! cargo run -p maktaba-cli -- migrate
//! cargo run -p maktaba-api &
//!
//! # Run the ignored integration tests against it:
//! cargo test -p maktaba-integration-tests -- --ignored
//! ```
//!
//! Tests are `#[ignore]`d by default so `cargo test` stays green without a
//! running server. They talk to the API over HTTP and to the database
//! directly (for seeding and assertions on counters).
//!
//! # Environment
//!
//! - `MAKTABA_BASE_URL` - API base URL (default: <http://localhost:3000>)
//! - `MAKTABA_DATABASE_URL` / `DATABASE_URL` - database for seeding

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use reqwest::Client;
use secrecy::SecretString;
use sqlx::PgPool;

/// Shared context for one integration test.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    pub pool: PgPool,
}

impl TestContext {
    /// Connect to the configured server and database.
    ///
    /// # Panics
    ///
    /// Panics when the database is unreachable; the ignored tests assume a
    /// prepared environment.
    pub async fn new() -> Self {
        let base_url = std::env::var("MAKTABA_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_owned());

        let database_url = std::env::var("MAKTABA_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .expect("MAKTABA_DATABASE_URL must be set for integration tests");

        let pool = maktaba_api::db::create_pool(&SecretString::from(database_url))
            .await
            .expect("failed to connect to test database");

        let client = Client::builder()
            .cookie_store(true)
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            base_url,
            pool,
        }
    }

    /// Absolute URL for an API path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Insert a published, available book and return its id.
    pub async fn seed_book(
        &self,
        title: &str,
        price: &str,
        discount_price: Option<&str>,
        stock_quantity: i32,
    ) -> i32 {
        let slug = format!(
            "{}-{}",
            title.to_lowercase().replace(' ', "-"),
            std::process::id()
        );
        sqlx::query_scalar(
            "INSERT INTO store.books \
               (title, slug, price, discount_price, is_published, is_available, stock_quantity) \
             VALUES ($1, $2, $3::numeric, $4::numeric, TRUE, TRUE, $5) \
             RETURNING id",
        )
        .bind(title)
        .bind(slug)
        .bind(price)
        .bind(discount_price)
        .bind(stock_quantity)
        .fetch_one(&self.pool)
        .await
        .expect("failed to seed book")
    }

    /// Current stock and sales counters for a book.
    pub async fn book_counters(&self, book_id: i32) -> (i32, i32) {
        sqlx::query_as("SELECT stock_quantity, sales_count FROM store.books WHERE id = $1")
            .bind(book_id)
            .fetch_one(&self.pool)
            .await
            .expect("failed to read book counters")
    }

    /// Force an order into a given status, bypassing the API guard rails.
    pub async fn force_order_status(&self, order_id: i64, status: &str) {
        sqlx::query("UPDATE store.orders SET status = $2::store.order_status WHERE id = $1")
            .bind(order_id)
            .bind(status)
            .execute(&self.pool)
            .await
            .expect("failed to force order status");
    }

    /// Delete a seeded book and everything hanging off it.
    pub async fn cleanup_book(&self, book_id: i32) {
        sqlx::query(
            "DELETE FROM store.orders o USING store.order_items i \
             WHERE i.order_id = o.id AND i.book_id = $1",
        )
        .bind(book_id)
        .execute(&self.pool)
        .await
        .ok();
        sqlx::query("DELETE FROM store.books WHERE id = $1")
            .bind(book_id)
            .execute(&self.pool)
            .await
            .ok();
    }
}

/// A minimal guest checkout body for one book.
#[must_use]
pub fn checkout_body(book_id: i32, quantity: i32) -> serde_json::Value {
    serde_json::json!({
        "customer_name": "Test Customer",
        "customer_email": "customer@example.com",
        "customer_phone": "0600000000",
        "shipping_address": "1 Test Street",
        "shipping_city": "Rabat",
        "items": [{ "book_id": book_id, "quantity": quantity }],
    })
}
