//! Blog post and blog category models.

use chrono::{DateTime, Utc};
use serde::Serialize;

use maktaba_core::{BlogCategoryId, BlogPostId, UserId};

/// A blog post. Tags are free-form labels stored on the post itself.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BlogPost {
    pub id: BlogPostId,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub tags: Vec<String>,
    pub category_id: Option<BlogCategoryId>,
    pub author_id: Option<UserId>,
    pub is_published: bool,
    pub is_featured: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub views_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A blog category with its post count.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BlogCategory {
    pub id: BlogCategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub posts_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A tag with the number of published posts carrying it.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TagCount {
    pub tag: String,
    pub posts_count: i64,
}
