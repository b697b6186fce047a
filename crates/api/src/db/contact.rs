//! Contact message and newsletter subscriber repository.

use sqlx::PgPool;
use uuid::Uuid;

use maktaba_core::ContactMessageId;

use super::RepositoryError;
use crate::models::contact::{ContactMessage, Subscriber};
use crate::pagination::{Page, PageParams};

const MESSAGE_COLUMNS: &str = "id, name, email, phone, subject, message, is_read, created_at";
const SUBSCRIBER_COLUMNS: &str =
    "id, email, unsubscribe_token, is_active, subscribed_at, unsubscribed_at";

/// Repository for contact and newsletter database operations.
pub struct ContactRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContactRepository<'a> {
    /// Create a new contact repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store an inbound contact message.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_message(
        &self,
        name: &str,
        email: &str,
        phone: Option<&str>,
        subject: Option<&str>,
        message: &str,
    ) -> Result<ContactMessage, RepositoryError> {
        let row: ContactMessage = sqlx::query_as(&format!(
            "INSERT INTO store.contact_messages (name, email, phone, subject, message) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(name)
        .bind(email)
        .bind(phone)
        .bind(subject)
        .bind(message)
        .fetch_one(self.pool)
        .await?;
        Ok(row)
    }

    /// Contact messages, newest first, optionally unread-only.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_messages(
        &self,
        unread_only: bool,
        params: PageParams,
        default_per_page: u32,
    ) -> Result<Page<ContactMessage>, RepositoryError> {
        let filter = if unread_only { " WHERE NOT is_read" } else { "" };

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM store.contact_messages{filter}"))
                .fetch_one(self.pool)
                .await?;

        let (limit, offset) = params.limit_offset(default_per_page);
        let messages: Vec<ContactMessage> = sqlx::query_as(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM store.contact_messages{filter} \
             ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(Page::new(messages, total, params, default_per_page))
    }

    /// Get one contact message.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_message(
        &self,
        id: ContactMessageId,
    ) -> Result<Option<ContactMessage>, RepositoryError> {
        let row: Option<ContactMessage> = sqlx::query_as(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM store.contact_messages WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Mark a message read or unread.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the message does not exist.
    pub async fn set_read(
        &self,
        id: ContactMessageId,
        is_read: bool,
    ) -> Result<ContactMessage, RepositoryError> {
        let row: Option<ContactMessage> = sqlx::query_as(&format!(
            "UPDATE store.contact_messages SET is_read = $2 WHERE id = $1 \
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(id)
        .bind(is_read)
        .fetch_optional(self.pool)
        .await?;
        row.ok_or(RepositoryError::NotFound)
    }

    /// Delete a message.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row was deleted.
    pub async fn delete_message(&self, id: ContactMessageId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM store.contact_messages WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // =========================================================================
    // Newsletter
    // =========================================================================

    /// Subscribe an email address. Re-activates a previously unsubscribed
    /// address instead of erroring.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn subscribe(&self, email: &str) -> Result<Subscriber, RepositoryError> {
        let row: Subscriber = sqlx::query_as(&format!(
            "INSERT INTO store.newsletter_subscribers (email) VALUES ($1) \
             ON CONFLICT (email) DO UPDATE \
               SET is_active = TRUE, unsubscribed_at = NULL \
             RETURNING {SUBSCRIBER_COLUMNS}"
        ))
        .bind(email)
        .fetch_one(self.pool)
        .await?;
        Ok(row)
    }

    /// Unsubscribe by email or by the token from a newsletter footer link.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` when nothing matches.
    pub async fn unsubscribe(
        &self,
        email: Option<&str>,
        token: Option<Uuid>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE store.newsletter_subscribers \
             SET is_active = FALSE, unsubscribed_at = NOW() \
             WHERE is_active AND (($1::text IS NOT NULL AND email = $1) \
                OR ($2::uuid IS NOT NULL AND unsubscribe_token = $2))",
        )
        .bind(email)
        .bind(token)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Active subscribers, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_subscribers(
        &self,
        params: PageParams,
        default_per_page: u32,
    ) -> Result<Page<Subscriber>, RepositoryError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM store.newsletter_subscribers WHERE is_active",
        )
        .fetch_one(self.pool)
        .await?;

        let (limit, offset) = params.limit_offset(default_per_page);
        let subscribers: Vec<Subscriber> = sqlx::query_as(&format!(
            "SELECT {SUBSCRIBER_COLUMNS} FROM store.newsletter_subscribers \
             WHERE is_active ORDER BY subscribed_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(Page::new(subscribers, total, params, default_per_page))
    }
}
