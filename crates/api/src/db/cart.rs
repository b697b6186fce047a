//! Shopping cart repository.
//!
//! Cart rows reprice live: `unit_price` is computed from the book's current
//! price and discount at query time, never snapshotted. Snapshots only
//! happen at order placement.

use sqlx::PgPool;

use maktaba_core::{BookId, CartItemId, UserId};

use super::RepositoryError;
use crate::models::cart::CartItem;

/// SELECT list for a cart item joined with its book.
const CART_ITEM_SELECT: &str = "SELECT c.id, c.user_id, c.book_id, b.title AS book_title, \
     b.slug AS book_slug, (b.price - COALESCE(b.discount_price, 0)) AS unit_price, \
     c.quantity, c.created_at, c.updated_at \
     FROM store.cart_items c JOIN store.books b ON b.id = c.book_id";

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All items in a user's cart, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items_for_user(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let items: Vec<CartItem> =
            sqlx::query_as(&format!("{CART_ITEM_SELECT} WHERE c.user_id = $1 ORDER BY c.id"))
                .bind(user_id)
                .fetch_all(self.pool)
                .await?;
        Ok(items)
    }

    /// Add a book to the cart, merging quantities when it is already there.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn add(
        &self,
        user_id: UserId,
        book_id: BookId,
        quantity: i32,
    ) -> Result<CartItem, RepositoryError> {
        let item_id: CartItemId = sqlx::query_scalar(
            "INSERT INTO store.cart_items AS c (user_id, book_id, quantity) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, book_id) DO UPDATE \
               SET quantity = c.quantity + EXCLUDED.quantity, \
                   updated_at = NOW() \
             RETURNING id",
        )
        .bind(user_id)
        .bind(book_id)
        .bind(quantity)
        .fetch_one(self.pool)
        .await?;

        let item: CartItem = sqlx::query_as(&format!("{CART_ITEM_SELECT} WHERE c.id = $1"))
            .bind(item_id)
            .fetch_one(self.pool)
            .await?;
        Ok(item)
    }

    /// Set the quantity of one of the user's cart items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` when the item does not exist or
    /// belongs to another user.
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: i32,
    ) -> Result<CartItem, RepositoryError> {
        let updated: Option<CartItemId> = sqlx::query_scalar(
            "UPDATE store.cart_items SET quantity = $3, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 RETURNING id",
        )
        .bind(item_id)
        .bind(user_id)
        .bind(quantity)
        .fetch_optional(self.pool)
        .await?;

        let item_id = updated.ok_or(RepositoryError::NotFound)?;
        let item: CartItem = sqlx::query_as(&format!("{CART_ITEM_SELECT} WHERE c.id = $1"))
            .bind(item_id)
            .fetch_one(self.pool)
            .await?;
        Ok(item)
    }

    /// Remove one of the user's cart items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` when the item does not exist or
    /// belongs to another user.
    pub async fn remove(&self, user_id: UserId, item_id: CartItemId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM store.cart_items WHERE id = $1 AND user_id = $2")
            .bind(item_id)
            .bind(user_id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Empty the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn clear(&self, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM store.cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}
