//! Blog handlers.

use axum::extract::{Path, Query, State};
use axum::{Json, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use maktaba_core::{BlogCategoryId, BlogPostId};

use crate::db::BlogRepository;
use crate::db::blog::{BlogFilter, BlogPostInput};
use crate::error::ApiError;
use crate::middleware::auth::{OptionalUser, RequireStaff};
use crate::models::blog::{BlogCategory, BlogPost, TagCount};
use crate::pagination::{Page, PageParams};
use crate::state::AppState;

const DEFAULT_POSTS_PER_PAGE: u32 = 12;

/// Query parameters for public post listings.
#[derive(Debug, Default, Deserialize)]
pub struct BlogListQuery {
    pub search: Option<String>,
    /// Category ID or slug.
    pub category: Option<String>,
    pub featured: Option<bool>,
    pub tag: Option<String>,
    /// Admin-only: "published" or "draft".
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl BlogListQuery {
    fn into_filter(self, public: bool) -> Result<(BlogFilter, PageParams), ApiError> {
        let page = PageParams::new(self.page, self.per_page);
        let mut filter = BlogFilter {
            published_only: public,
            search: self.search,
            featured: self.featured,
            tag: self.tag,
            ..BlogFilter::default()
        };

        if let Some(category) = self.category.filter(|c| !c.is_empty()) {
            match category.parse::<i32>() {
                Ok(id) => filter.category_id = Some(BlogCategoryId::new(id)),
                Err(_) => filter.category_slug = Some(category),
            }
        }

        if !public {
            filter.published_state = match self.status.as_deref() {
                Some("published") => Some(true),
                Some("draft") => Some(false),
                None | Some("") => None,
                Some(other) => {
                    return Err(ApiError::Validation(format!(
                        "status must be 'published' or 'draft', got '{other}'"
                    )));
                }
            };
        }

        Ok((filter, page))
    }
}

/// Limit query for featured/recent/related listings.
#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

/// Search query for tag listing.
#[derive(Debug, Deserialize)]
pub struct TagQuery {
    pub search: Option<String>,
}

/// Post create/update payload (staff).
#[derive(Debug, Deserialize)]
pub struct BlogPostPayload {
    pub title: String,
    pub excerpt: Option<String>,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub category_id: Option<i32>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub is_featured: bool,
    pub published_at: Option<DateTime<Utc>>,
}

impl BlogPostPayload {
    fn validate(&self) -> Result<(), ApiError> {
        let title = self.title.trim();
        if title.is_empty() || title.len() > 255 {
            return Err(ApiError::Validation(
                "title is required and must be at most 255 characters".to_owned(),
            ));
        }
        if self.content.trim().is_empty() {
            return Err(ApiError::Validation("content is required".to_owned()));
        }
        Ok(())
    }
}

/// Category create/update payload (staff).
#[derive(Debug, Deserialize)]
pub struct BlogCategoryPayload {
    pub name: String,
    pub description: Option<String>,
}

/// `GET /api/blog`
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<BlogListQuery>,
) -> Result<Json<Page<BlogPost>>, ApiError> {
    let (filter, page) = query.into_filter(true)?;
    let posts = BlogRepository::new(state.pool())
        .list(&filter, page, DEFAULT_POSTS_PER_PAGE)
        .await?;
    Ok(Json(posts))
}

/// `GET /api/blog/categories`
pub async fn categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<BlogCategory>>, ApiError> {
    let categories = BlogRepository::new(state.pool()).list_categories().await?;
    Ok(Json(categories))
}

/// `GET /api/blog/tags`
pub async fn tags(
    State(state): State<AppState>,
    Query(query): Query<TagQuery>,
) -> Result<Json<Vec<TagCount>>, ApiError> {
    let tags = BlogRepository::new(state.pool())
        .tags(query.search.as_deref())
        .await?;
    Ok(Json(tags))
}

/// `GET /api/blog/tags/popular`
pub async fn popular_tags(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<TagCount>>, ApiError> {
    let limit = query.limit.unwrap_or(10).clamp(1, 100);
    let tags = BlogRepository::new(state.pool()).popular_tags(limit).await?;
    Ok(Json(tags))
}

/// `GET /api/blog/featured`
pub async fn featured(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<BlogPost>>, ApiError> {
    let limit = query.limit.unwrap_or(5).clamp(1, 50);
    let posts = BlogRepository::new(state.pool()).featured(limit).await?;
    Ok(Json(posts))
}

/// `GET /api/blog/recent`
pub async fn recent(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<BlogPost>>, ApiError> {
    let limit = query.limit.unwrap_or(5).clamp(1, 50);
    let posts = BlogRepository::new(state.pool()).recent(limit).await?;
    Ok(Json(posts))
}

/// `GET /api/blog/{slug}`
///
/// Drafts are visible to staff only; everyone else gets a 404 so draft
/// slugs stay unguessable.
pub async fn show(
    State(state): State<AppState>,
    OptionalUser(current): OptionalUser,
    Path(slug): Path<String>,
) -> Result<Json<BlogPost>, ApiError> {
    let repo = BlogRepository::new(state.pool());
    let post = repo
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("post '{slug}' not found")))?;

    let is_staff = current.is_some_and(|user| user.is_staff);
    if !post.is_published && !is_staff {
        return Err(ApiError::NotFound(format!("post '{slug}' not found")));
    }

    repo.increment_views(post.id).await?;
    Ok(Json(post))
}

/// `GET /api/blog/{slug}/related`
pub async fn related(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<BlogPost>>, ApiError> {
    let repo = BlogRepository::new(state.pool());
    let post = repo
        .get_by_slug(&slug)
        .await?
        .filter(|post| post.is_published)
        .ok_or_else(|| ApiError::NotFound(format!("post '{slug}' not found")))?;

    let limit = query.limit.unwrap_or(3).clamp(1, 20);
    let posts = repo.related(&post, limit).await?;
    Ok(Json(posts))
}

/// `GET /api/admin/blog`
pub async fn admin_index(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<BlogListQuery>,
) -> Result<Json<Page<BlogPost>>, ApiError> {
    let (filter, page) = query.into_filter(false)?;
    let posts = BlogRepository::new(state.pool())
        .list(&filter, page, DEFAULT_POSTS_PER_PAGE)
        .await?;
    Ok(Json(posts))
}

/// `POST /api/admin/blog`
pub async fn store(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    Json(payload): Json<BlogPostPayload>,
) -> Result<(StatusCode, Json<BlogPost>), ApiError> {
    payload.validate()?;

    // Publishing without an explicit date stamps now.
    let published_at = match (payload.is_published, payload.published_at) {
        (true, None) => Some(Utc::now()),
        (_, explicit) => explicit,
    };

    let post = BlogRepository::new(state.pool())
        .create(&BlogPostInput {
            title: payload.title.trim().to_owned(),
            excerpt: payload.excerpt,
            content: payload.content,
            tags: normalize_tags(payload.tags),
            category_id: payload.category_id.map(BlogCategoryId::new),
            author_id: Some(staff.id),
            is_published: payload.is_published,
            is_featured: payload.is_featured,
            published_at,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// `PUT /api/admin/blog/{id}`
pub async fn update(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<BlogPostPayload>,
) -> Result<Json<BlogPost>, ApiError> {
    payload.validate()?;

    let repo = BlogRepository::new(state.pool());
    let existing = repo
        .get_by_id(BlogPostId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("post not found".to_owned()))?;

    // First publication stamps now unless the payload says otherwise.
    let published_at = payload
        .published_at
        .or(existing.published_at)
        .or_else(|| payload.is_published.then(Utc::now));

    let post = repo
        .update(
            existing.id,
            &BlogPostInput {
                title: payload.title.trim().to_owned(),
                excerpt: payload.excerpt,
                content: payload.content,
                tags: normalize_tags(payload.tags),
                category_id: payload.category_id.map(BlogCategoryId::new),
                author_id: existing.author_id,
                is_published: payload.is_published,
                is_featured: payload.is_featured,
                published_at,
            },
        )
        .await?;
    Ok(Json(post))
}

/// `DELETE /api/admin/blog/{id}`
pub async fn destroy(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    BlogRepository::new(state.pool())
        .delete(BlogPostId::new(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/admin/blog-categories`
pub async fn store_category(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Json(payload): Json<BlogCategoryPayload>,
) -> Result<(StatusCode, Json<BlogCategory>), ApiError> {
    let name = payload.name.trim();
    if name.is_empty() || name.len() > 255 {
        return Err(ApiError::Validation(
            "name is required and must be at most 255 characters".to_owned(),
        ));
    }

    let category = BlogRepository::new(state.pool())
        .create_category(name, payload.description.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// `PUT /api/admin/blog-categories/{id}`
pub async fn update_category(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<BlogCategoryPayload>,
) -> Result<Json<BlogCategory>, ApiError> {
    let name = payload.name.trim();
    if name.is_empty() || name.len() > 255 {
        return Err(ApiError::Validation(
            "name is required and must be at most 255 characters".to_owned(),
        ));
    }

    let category = BlogRepository::new(state.pool())
        .update_category(BlogCategoryId::new(id), name, payload.description.as_deref())
        .await?;
    Ok(Json(category))
}

/// `DELETE /api/admin/blog-categories/{id}`
pub async fn destroy_category(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    BlogRepository::new(state.pool())
        .delete_category(BlogCategoryId::new(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Trim tags, drop empties, dedupe case-insensitively (first spelling wins).
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.into_iter()
        .map(|tag| tag.trim().to_owned())
        .filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(tag.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tags() {
        let tags = normalize_tags(vec![
            " droit ".to_owned(),
            String::new(),
            "Droit".to_owned(),
            "histoire".to_owned(),
        ]);
        assert_eq!(tags, vec!["droit".to_owned(), "histoire".to_owned()]);
    }
}
