//! Database operations for the store `PostgreSQL` database.
//!
//! # Tables (schema `store`)
//!
//! - `users`, `session` - accounts and tower-sessions storage
//! - `categories`, `authors`, `publishers`, `series`, `physical_formats`,
//!   `keywords` - catalog taxonomies
//! - `books`, `book_authors`, `book_keywords` - the catalog itself
//! - `orders`, `order_items` - order placement
//! - `book_reviews` - moderated reviews
//! - `cart_items`, `wishlists` - per-user shopping state
//! - `blog_categories`, `blog_posts` - the blog
//! - `contact_messages`, `newsletter_subscribers` - inbound contact
//! - `settings` - key/value configuration rows
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p maktaba-cli -- migrate
//! ```

pub mod blog;
pub mod books;
pub mod cart;
pub mod contact;
pub mod orders;
pub mod reviews;
pub mod settings;
pub mod taxonomies;
pub mod users;
pub mod wishlist;

use std::time::Duration;

use futures::future::BoxFuture;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool};
use thiserror::Error;

pub use blog::BlogRepository;
pub use books::BookRepository;
pub use cart::CartRepository;
pub use contact::ContactRepository;
pub use orders::OrderRepository;
pub use reviews::ReviewRepository;
pub use settings::SettingsRepository;
pub use taxonomies::{TaxonomyKind, TaxonomyRepository};
pub use users::UserRepository;
pub use wishlist::WishlistRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email or slug).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a sqlx error, turning unique violations into [`Self::Conflict`].
    pub(crate) fn from_sqlx(err: sqlx::Error, conflict_message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(conflict_message.to_owned());
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Run a set of operations as one database transaction.
///
/// Begins a transaction, hands the raw connection to `op`, commits when the
/// closure returns `Ok` and rolls back on `Err`. This is the single unit of
/// work used by order creation and cancellation: either every row written
/// inside the closure becomes visible at once, or none does.
///
/// # Errors
///
/// Returns the closure's error after rolling back, or the commit/begin error.
pub async fn with_transaction<T, E, F>(pool: &PgPool, op: F) -> Result<T, E>
where
    E: From<sqlx::Error>,
    F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T, E>>,
{
    let mut tx = pool.begin().await.map_err(E::from)?;

    match op(&mut *tx).await {
        Ok(value) => {
            tx.commit().await.map_err(E::from)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(error = %rollback_err, "transaction rollback failed");
            }
            Err(err)
        }
    }
}
