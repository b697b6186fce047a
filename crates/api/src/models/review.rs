//! Book review model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use maktaba_core::{BookId, ReviewId, UserId};

/// A review left on a book. Reviews are hidden until approved by staff.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Review {
    pub id: ReviewId,
    pub book_id: BookId,
    pub user_id: Option<UserId>,
    pub reviewer_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer_email: Option<String>,
    pub rating: i32,
    pub title: Option<String>,
    pub comment: Option<String>,
    pub is_verified_purchase: bool,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
