//! Contact message and newsletter subscriber models.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use maktaba_core::{ContactMessageId, SubscriberId};

/// A message submitted through the contact form.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ContactMessage {
    pub id: ContactMessageId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// A newsletter subscriber.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub email: String,
    #[serde(skip_serializing)]
    pub unsubscribe_token: Uuid,
    pub is_active: bool,
    pub subscribed_at: DateTime<Utc>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
}
