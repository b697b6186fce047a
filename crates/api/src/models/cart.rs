//! Shopping cart models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use maktaba_core::{BookId, CartItemId, UserId};

/// One entry in a user's cart, joined with the book it references.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: UserId,
    pub book_id: BookId,
    pub book_title: String,
    pub book_slug: String,
    /// The book's current final price (not a snapshot; carts reprice live).
    pub unit_price: Decimal,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartItem {
    /// Line total at the current price.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A whole cart with its running totals.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub data: Vec<CartItem>,
    pub total: Decimal,
    pub count: i64,
}

impl CartView {
    /// Build the view from loaded items.
    #[must_use]
    pub fn from_items(items: Vec<CartItem>) -> Self {
        let total = items.iter().map(CartItem::line_total).sum();
        let count = items.iter().map(|item| i64::from(item.quantity)).sum();
        Self {
            data: items,
            total,
            count,
        }
    }
}
