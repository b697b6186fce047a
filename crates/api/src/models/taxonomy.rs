//! Catalog taxonomy entities (categories, authors, publishers, series,
//! physical formats, keywords).
//!
//! All six share one shape: name, unique slug, optional description. The
//! repository is parameterized by [`crate::db::TaxonomyKind`] instead of
//! duplicating six near-identical modules.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A taxonomy row, with its book count.
///
/// The `id` is deliberately untyped here: one struct serves six tables.
/// Typed IDs (`CategoryId`, `AuthorId`, ...) appear on the entities that
/// reference taxonomies, where mixing them up would matter.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Taxonomy {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub books_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A lightweight reference to a taxonomy row, embedded in book payloads.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TaxonomyRef {
    pub id: i32,
    pub name: String,
    pub slug: String,
}
