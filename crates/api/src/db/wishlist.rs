//! Wishlist repository.

use sqlx::PgPool;

use maktaba_core::{BookId, UserId};

use super::RepositoryError;
use super::books::BOOK_COLUMNS_QUALIFIED;
use crate::models::book::Book;
use crate::pagination::{Page, PageParams};

/// Repository for wishlist database operations.
pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    /// Create a new wishlist repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Books on the user's wishlist, most recently added first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        user_id: UserId,
        params: PageParams,
        default_per_page: u32,
    ) -> Result<Page<Book>, RepositoryError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM store.wishlists WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(self.pool)
                .await?;

        let (limit, offset) = params.limit_offset(default_per_page);
        let books: Vec<Book> = sqlx::query_as(&format!(
            "SELECT {BOOK_COLUMNS_QUALIFIED} FROM store.wishlists w \
             JOIN store.books b ON b.id = w.book_id \
             WHERE w.user_id = $1 \
             ORDER BY w.created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let books = books.into_iter().map(Book::with_computed_price).collect();
        Ok(Page::new(books, total, params, default_per_page))
    }

    /// Add a book to the wishlist. Returns false when it was already there.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn add(&self, user_id: UserId, book_id: BookId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO store.wishlists (user_id, book_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, book_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(book_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a book from the wishlist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` when the book was not wishlisted.
    pub async fn remove(&self, user_id: UserId, book_id: BookId) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("DELETE FROM store.wishlists WHERE user_id = $1 AND book_id = $2")
                .bind(user_id)
                .bind(book_id)
                .execute(self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Empty the user's wishlist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn clear(&self, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM store.wishlists WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Whether a book is on the user's wishlist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn contains(&self, user_id: UserId, book_id: BookId) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM store.wishlists WHERE user_id = $1 AND book_id = $2)",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }
}
