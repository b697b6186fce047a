//! Blog repository: posts, categories, and tag aggregation.
//!
//! Tags are free-form labels stored as a text array on each post; the tag
//! listing endpoints aggregate over that array with `unnest`.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use maktaba_core::{BlogCategoryId, BlogPostId, UserId, slugify};

use super::RepositoryError;
use crate::models::blog::{BlogCategory, BlogPost, TagCount};
use crate::pagination::{Page, PageParams};

const POST_COLUMNS: &str = "id, title, slug, excerpt, content, tags, category_id, author_id, \
     is_published, is_featured, published_at, views_count, created_at, updated_at";

/// Optional filters for blog post listings.
#[derive(Debug, Default, Clone)]
pub struct BlogFilter {
    /// Only published posts (public listings).
    pub published_only: bool,
    /// Admin-side filter: Some(true) = published, Some(false) = drafts.
    pub published_state: Option<bool>,
    pub search: Option<String>,
    pub category_id: Option<BlogCategoryId>,
    pub category_slug: Option<String>,
    pub featured: Option<bool>,
    pub tag: Option<String>,
}

/// Fields accepted when creating or replacing a post.
#[derive(Debug, Clone)]
pub struct BlogPostInput {
    pub title: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub tags: Vec<String>,
    pub category_id: Option<BlogCategoryId>,
    pub author_id: Option<UserId>,
    pub is_published: bool,
    pub is_featured: bool,
    pub published_at: Option<DateTime<Utc>>,
}

/// Repository for blog database operations.
pub struct BlogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BlogRepository<'a> {
    /// Create a new blog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List posts matching `filter`, paginated. Posts order by publication
    /// date, unpublished drafts last.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &BlogFilter,
        params: PageParams,
        default_per_page: u32,
    ) -> Result<Page<BlogPost>, RepositoryError> {
        let mut count_query =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM store.blog_posts WHERE TRUE");
        push_filters(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(self.pool)
            .await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {POST_COLUMNS} FROM store.blog_posts WHERE TRUE"
        ));
        push_filters(&mut query, filter);
        query.push(" ORDER BY published_at DESC NULLS LAST, created_at DESC");

        let (limit, offset) = params.limit_offset(default_per_page);
        query.push(" LIMIT ");
        query.push_bind(limit);
        query.push(" OFFSET ");
        query.push_bind(offset);

        let posts: Vec<BlogPost> = query.build_query_as().fetch_all(self.pool).await?;
        Ok(Page::new(posts, total, params, default_per_page))
    }

    /// Get a post by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<BlogPost>, RepositoryError> {
        let post: Option<BlogPost> = sqlx::query_as(&format!(
            "SELECT {POST_COLUMNS} FROM store.blog_posts WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;
        Ok(post)
    }

    /// Get a post by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: BlogPostId) -> Result<Option<BlogPost>, RepositoryError> {
        let post: Option<BlogPost> = sqlx::query_as(&format!(
            "SELECT {POST_COLUMNS} FROM store.blog_posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(post)
    }

    /// Record one more view of a post.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn increment_views(&self, id: BlogPostId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE store.blog_posts SET views_count = views_count + 1 WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Published featured posts, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn featured(&self, limit: i64) -> Result<Vec<BlogPost>, RepositoryError> {
        let posts: Vec<BlogPost> = sqlx::query_as(&format!(
            "SELECT {POST_COLUMNS} FROM store.blog_posts \
             WHERE is_published AND is_featured \
             ORDER BY published_at DESC NULLS LAST LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(posts)
    }

    /// Most recently published posts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent(&self, limit: i64) -> Result<Vec<BlogPost>, RepositoryError> {
        let posts: Vec<BlogPost> = sqlx::query_as(&format!(
            "SELECT {POST_COLUMNS} FROM store.blog_posts \
             WHERE is_published \
             ORDER BY published_at DESC NULLS LAST LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(posts)
    }

    /// Published posts related to `post`: same category or same author.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn related(
        &self,
        post: &BlogPost,
        limit: i64,
    ) -> Result<Vec<BlogPost>, RepositoryError> {
        let posts: Vec<BlogPost> = sqlx::query_as(&format!(
            "SELECT {POST_COLUMNS} FROM store.blog_posts \
             WHERE is_published AND id <> $1 \
               AND (($2::int4 IS NOT NULL AND category_id = $2) \
                 OR ($3::int4 IS NOT NULL AND author_id = $3)) \
             ORDER BY published_at DESC NULLS LAST LIMIT $4"
        ))
        .bind(post.id)
        .bind(post.category_id)
        .bind(post.author_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(posts)
    }

    /// Insert a new post. The slug is derived from the title.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on slug collision.
    pub async fn create(&self, input: &BlogPostInput) -> Result<BlogPost, RepositoryError> {
        let slug = derive_slug(&input.title);

        let post: BlogPost = sqlx::query_as(&format!(
            "INSERT INTO store.blog_posts \
               (title, slug, excerpt, content, tags, category_id, author_id, \
                is_published, is_featured, published_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(&input.title)
        .bind(&slug)
        .bind(&input.excerpt)
        .bind(&input.content)
        .bind(&input.tags)
        .bind(input.category_id)
        .bind(input.author_id)
        .bind(input.is_published)
        .bind(input.is_featured)
        .bind(input.published_at)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx(e, "a post with this slug already exists"))?;

        Ok(post)
    }

    /// Replace a post's fields. The slug follows the title.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the post does not exist,
    /// `RepositoryError::Conflict` on slug collision.
    pub async fn update(
        &self,
        id: BlogPostId,
        input: &BlogPostInput,
    ) -> Result<BlogPost, RepositoryError> {
        let slug = derive_slug(&input.title);

        let post: Option<BlogPost> = sqlx::query_as(&format!(
            "UPDATE store.blog_posts SET \
               title = $2, slug = $3, excerpt = $4, content = $5, tags = $6, \
               category_id = $7, is_published = $8, is_featured = $9, \
               published_at = $10, updated_at = NOW() \
             WHERE id = $1 RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(&input.title)
        .bind(&slug)
        .bind(&input.excerpt)
        .bind(&input.content)
        .bind(&input.tags)
        .bind(input.category_id)
        .bind(input.is_published)
        .bind(input.is_featured)
        .bind(input.published_at)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx(e, "a post with this slug already exists"))?;

        post.ok_or(RepositoryError::NotFound)
    }

    /// Delete a post.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row was deleted.
    pub async fn delete(&self, id: BlogPostId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM store.blog_posts WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// All blog categories with their published post counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<BlogCategory>, RepositoryError> {
        let categories: Vec<BlogCategory> = sqlx::query_as(
            "SELECT c.id, c.name, c.slug, c.description, \
               (SELECT COUNT(*) FROM store.blog_posts p \
                WHERE p.category_id = c.id AND p.is_published) AS posts_count, \
               c.created_at, c.updated_at \
             FROM store.blog_categories c ORDER BY c.name",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(categories)
    }

    /// Insert a blog category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on slug collision.
    pub async fn create_category(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<BlogCategory, RepositoryError> {
        let slug = derive_slug(name);

        let category: BlogCategory = sqlx::query_as(
            "WITH inserted AS (\
               INSERT INTO store.blog_categories (name, slug, description) \
               VALUES ($1, $2, $3) \
               RETURNING id, name, slug, description, created_at, updated_at\
             ) \
             SELECT c.id, c.name, c.slug, c.description, 0::int8 AS posts_count, \
                    c.created_at, c.updated_at FROM inserted c",
        )
        .bind(name)
        .bind(&slug)
        .bind(description)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx(e, "a blog category with this slug already exists"))?;

        Ok(category)
    }

    /// Replace a blog category's name and description.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    pub async fn update_category(
        &self,
        id: BlogCategoryId,
        name: &str,
        description: Option<&str>,
    ) -> Result<BlogCategory, RepositoryError> {
        let slug = derive_slug(name);

        let category: Option<BlogCategory> = sqlx::query_as(
            "WITH updated AS (\
               UPDATE store.blog_categories SET name = $2, slug = $3, description = $4, \
               updated_at = NOW() WHERE id = $1 \
               RETURNING id, name, slug, description, created_at, updated_at\
             ) \
             SELECT c.id, c.name, c.slug, c.description, \
               (SELECT COUNT(*) FROM store.blog_posts p \
                WHERE p.category_id = c.id AND p.is_published) AS posts_count, \
               c.created_at, c.updated_at FROM updated c",
        )
        .bind(id)
        .bind(name)
        .bind(&slug)
        .bind(description)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx(e, "a blog category with this slug already exists"))?;

        category.ok_or(RepositoryError::NotFound)
    }

    /// Delete a blog category. Posts keep existing with a null category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row was deleted.
    pub async fn delete_category(&self, id: BlogCategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM store.blog_categories WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // =========================================================================
    // Tags
    // =========================================================================

    /// All tags across published posts with their usage counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn tags(&self, search: Option<&str>) -> Result<Vec<TagCount>, RepositoryError> {
        let pattern = search
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{s}%"));

        let tags: Vec<TagCount> = sqlx::query_as(
            "SELECT tag, COUNT(*) AS posts_count \
             FROM store.blog_posts, UNNEST(tags) AS tag \
             WHERE is_published AND ($1::text IS NULL OR tag ILIKE $1) \
             GROUP BY tag ORDER BY tag",
        )
        .bind(pattern)
        .fetch_all(self.pool)
        .await?;
        Ok(tags)
    }

    /// Most used tags across published posts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn popular_tags(&self, limit: i64) -> Result<Vec<TagCount>, RepositoryError> {
        let tags: Vec<TagCount> = sqlx::query_as(
            "SELECT tag, COUNT(*) AS posts_count \
             FROM store.blog_posts, UNNEST(tags) AS tag \
             WHERE is_published \
             GROUP BY tag ORDER BY posts_count DESC, tag LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(tags)
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &BlogFilter) {
    if filter.published_only {
        query.push(" AND is_published");
    }
    if let Some(published) = filter.published_state {
        query.push(" AND is_published = ");
        query.push_bind(published);
    }
    if let Some(featured) = filter.featured {
        query.push(" AND is_featured = ");
        query.push_bind(featured);
    }
    if let Some(category_id) = filter.category_id {
        query.push(" AND category_id = ");
        query.push_bind(category_id);
    }
    if let Some(slug) = filter.category_slug.as_deref().filter(|s| !s.is_empty()) {
        query.push(
            " AND category_id IN (SELECT id FROM store.blog_categories WHERE slug = ",
        );
        query.push_bind(slug.to_owned());
        query.push(")");
    }
    if let Some(tag) = filter.tag.as_deref().filter(|s| !s.is_empty()) {
        query.push(" AND ");
        query.push_bind(tag.to_owned());
        query.push(" = ANY(tags)");
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        query.push(" AND (title ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR content ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR excerpt ILIKE ");
        query.push_bind(pattern);
        query.push(")");
    }
}

fn derive_slug(title: &str) -> String {
    let slug = slugify(title);
    if slug.is_empty() { "post".to_owned() } else { slug }
}
