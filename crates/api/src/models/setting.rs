//! Settings model.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One key/value configuration row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Setting {
    pub id: i32,
    pub key: String,
    pub value: String,
    pub value_type: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
