//! Book review repository.
//!
//! Every mutation that changes the approved set also refreshes the book's
//! denormalized `rating` and `reviews_count` via [`ReviewRepository::refresh_book_rating`].

use sqlx::PgPool;

use maktaba_core::{BookId, ReviewId, UserId};

use super::RepositoryError;
use crate::models::review::Review;
use crate::pagination::{Page, PageParams};

const REVIEW_COLUMNS: &str = "id, book_id, user_id, reviewer_name, reviewer_email, rating, \
     title, comment, is_verified_purchase, is_approved, created_at, updated_at";

/// Fields accepted when submitting a review.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub book_id: BookId,
    pub user_id: Option<UserId>,
    pub reviewer_name: String,
    pub reviewer_email: Option<String>,
    pub rating: i32,
    pub title: Option<String>,
    pub comment: Option<String>,
    pub is_verified_purchase: bool,
}

/// Repository for review database operations.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Approved reviews of a book, paginated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_approved_for_book(
        &self,
        book_id: BookId,
        sort_order: Option<&str>,
        params: PageParams,
        default_per_page: u32,
    ) -> Result<Page<Review>, RepositoryError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM store.book_reviews WHERE book_id = $1 AND is_approved",
        )
        .bind(book_id)
        .fetch_one(self.pool)
        .await?;

        let direction = if sort_order == Some("asc") { "ASC" } else { "DESC" };
        let (limit, offset) = params.limit_offset(default_per_page);

        let reviews: Vec<Review> = sqlx::query_as(&format!(
            "SELECT {REVIEW_COLUMNS} FROM store.book_reviews \
             WHERE book_id = $1 AND is_approved \
             ORDER BY created_at {direction} LIMIT $2 OFFSET $3"
        ))
        .bind(book_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(Page::new(reviews, total, params, default_per_page))
    }

    /// Latest approved reviews of a book, for embedding in the detail payload.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent_approved_for_book(
        &self,
        book_id: BookId,
        limit: i64,
    ) -> Result<Vec<Review>, RepositoryError> {
        let reviews: Vec<Review> = sqlx::query_as(&format!(
            "SELECT {REVIEW_COLUMNS} FROM store.book_reviews \
             WHERE book_id = $1 AND is_approved \
             ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(book_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(reviews)
    }

    /// Reviews awaiting moderation, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn pending(
        &self,
        params: PageParams,
        default_per_page: u32,
    ) -> Result<Page<Review>, RepositoryError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM store.book_reviews WHERE NOT is_approved")
                .fetch_one(self.pool)
                .await?;

        let (limit, offset) = params.limit_offset(default_per_page);
        let reviews: Vec<Review> = sqlx::query_as(&format!(
            "SELECT {REVIEW_COLUMNS} FROM store.book_reviews \
             WHERE NOT is_approved ORDER BY created_at ASC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(Page::new(reviews, total, params, default_per_page))
    }

    /// Get a review by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let review: Option<Review> = sqlx::query_as(&format!(
            "SELECT {REVIEW_COLUMNS} FROM store.book_reviews WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(review)
    }

    /// Whether `user_id` already reviewed `book_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn user_has_reviewed(
        &self,
        book_id: BookId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM store.book_reviews WHERE book_id = $1 AND user_id = $2)",
        )
        .bind(book_id)
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// Whether `user_id` has a shipped or delivered order containing the book.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn user_has_purchased(
        &self,
        book_id: BookId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (\
               SELECT 1 FROM store.orders o \
               JOIN store.order_items i ON i.order_id = o.id \
               WHERE o.user_id = $1 AND i.book_id = $2 \
                 AND o.status IN ('shipped', 'delivered'))",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// Insert a review (unapproved until moderated).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, input: &NewReview) -> Result<Review, RepositoryError> {
        let review: Review = sqlx::query_as(&format!(
            "INSERT INTO store.book_reviews \
               (book_id, user_id, reviewer_name, reviewer_email, rating, title, comment, \
                is_verified_purchase) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(input.book_id)
        .bind(input.user_id)
        .bind(&input.reviewer_name)
        .bind(&input.reviewer_email)
        .bind(input.rating)
        .bind(&input.title)
        .bind(&input.comment)
        .bind(input.is_verified_purchase)
        .fetch_one(self.pool)
        .await?;

        self.refresh_book_rating(input.book_id).await?;
        Ok(review)
    }

    /// Update a review's content. Editing resets approval.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review does not exist.
    pub async fn update_content(
        &self,
        id: ReviewId,
        rating: i32,
        title: Option<&str>,
        comment: Option<&str>,
    ) -> Result<Review, RepositoryError> {
        let review: Option<Review> = sqlx::query_as(&format!(
            "UPDATE store.book_reviews SET rating = $2, title = $3, comment = $4, \
             is_approved = FALSE, updated_at = NOW() \
             WHERE id = $1 RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(id)
        .bind(rating)
        .bind(title)
        .bind(comment)
        .fetch_optional(self.pool)
        .await?;

        let review = review.ok_or(RepositoryError::NotFound)?;
        self.refresh_book_rating(review.book_id).await?;
        Ok(review)
    }

    /// Approve or unapprove a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review does not exist.
    pub async fn set_approved(
        &self,
        id: ReviewId,
        approved: bool,
    ) -> Result<Review, RepositoryError> {
        let review: Option<Review> = sqlx::query_as(&format!(
            "UPDATE store.book_reviews SET is_approved = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(id)
        .bind(approved)
        .fetch_optional(self.pool)
        .await?;

        let review = review.ok_or(RepositoryError::NotFound)?;
        self.refresh_book_rating(review.book_id).await?;
        Ok(review)
    }

    /// Delete a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row was deleted.
    pub async fn delete(&self, id: ReviewId) -> Result<(), RepositoryError> {
        let book_id: Option<BookId> = sqlx::query_scalar(
            "DELETE FROM store.book_reviews WHERE id = $1 RETURNING book_id",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        let book_id = book_id.ok_or(RepositoryError::NotFound)?;
        self.refresh_book_rating(book_id).await?;
        Ok(())
    }

    /// Recompute a book's rating and review count from its approved reviews.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn refresh_book_rating(&self, book_id: BookId) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE store.books b SET \
               rating = COALESCE(agg.avg_rating, 0), \
               reviews_count = COALESCE(agg.cnt, 0), \
               updated_at = NOW() \
             FROM (SELECT ROUND(AVG(rating)::numeric, 2) AS avg_rating, COUNT(*) AS cnt \
                   FROM store.book_reviews WHERE book_id = $1 AND is_approved) agg \
             WHERE b.id = $1",
        )
        .bind(book_id)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}
