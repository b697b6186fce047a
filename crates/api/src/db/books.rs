//! Book repository.
//!
//! List queries are assembled with `QueryBuilder` because every filter is
//! optional. Sort columns go through a whitelist; only values are bound.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use maktaba_core::{AuthorId, BookId, CategoryId, KeywordId, slugify};

use super::RepositoryError;
use crate::models::book::Book;
use crate::models::taxonomy::TaxonomyRef;
use crate::pagination::{Page, PageParams};

/// Columns selected for every book row.
pub(crate) const BOOK_COLUMNS: &str = "id, title, slug, isbn, price, discount_price, pages, \
     description, summary, front_image_url, back_image_url, language, edition, publication_date, \
     is_published, is_available, is_featured, stock_quantity, views_count, sales_count, \
     rating, reviews_count, category_id, publisher_id, series_id, physical_format_id, \
     created_at, updated_at";

/// The same columns qualified with the `b` alias, for joined queries.
pub(crate) const BOOK_COLUMNS_QUALIFIED: &str = "b.id, b.title, b.slug, b.isbn, b.price, \
     b.discount_price, b.pages, b.description, b.summary, b.front_image_url, b.back_image_url, \
     b.language, b.edition, b.publication_date, b.is_published, b.is_available, b.is_featured, \
     b.stock_quantity, b.views_count, b.sales_count, b.rating, b.reviews_count, b.category_id, \
     b.publisher_id, b.series_id, b.physical_format_id, b.created_at, b.updated_at";

/// Optional filters for book listings.
#[derive(Debug, Default, Clone)]
pub struct BookFilter {
    /// Only published AND available books (public listings).
    pub storefront_only: bool,
    pub category: Option<CategoryId>,
    pub author: Option<AuthorId>,
    pub search: Option<String>,
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
    pub featured_only: bool,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

/// Map a requested sort column onto the whitelist.
fn sort_column(requested: Option<&str>) -> &'static str {
    match requested {
        Some("title") => "title",
        Some("price") => "price",
        Some("rating") => "rating",
        Some("sales_count") => "sales_count",
        Some("views_count") => "views_count",
        Some("publication_date") => "publication_date",
        _ => "created_at",
    }
}

/// Map a requested sort direction onto ASC/DESC.
fn sort_direction(requested: Option<&str>) -> &'static str {
    match requested {
        Some("asc") => "ASC",
        _ => "DESC",
    }
}

/// Fields accepted when creating or replacing a book.
#[derive(Debug, Clone)]
pub struct BookInput {
    pub title: String,
    pub isbn: Option<String>,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub pages: Option<i32>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub front_image_url: Option<String>,
    pub back_image_url: Option<String>,
    pub language: Option<String>,
    pub edition: Option<String>,
    pub publication_date: Option<chrono::NaiveDate>,
    pub is_published: bool,
    pub is_available: bool,
    pub is_featured: bool,
    pub stock_quantity: i32,
    pub category_id: Option<i32>,
    pub publisher_id: Option<i32>,
    pub series_id: Option<i32>,
    pub physical_format_id: Option<i32>,
}

/// Repository for book database operations.
pub struct BookRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BookRepository<'a> {
    /// Create a new book repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List books matching `filter`, paginated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &BookFilter,
        params: PageParams,
        default_per_page: u32,
    ) -> Result<Page<Book>, RepositoryError> {
        let mut count_query =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM store.books WHERE TRUE");
        push_filters(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(self.pool)
            .await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {BOOK_COLUMNS} FROM store.books WHERE TRUE"
        ));
        push_filters(&mut query, filter);
        query.push(format!(
            " ORDER BY {} {}",
            sort_column(filter.sort_by.as_deref()),
            sort_direction(filter.sort_order.as_deref())
        ));

        let (limit, offset) = params.limit_offset(default_per_page);
        query.push(" LIMIT ");
        query.push_bind(limit);
        query.push(" OFFSET ");
        query.push_bind(offset);

        let books: Vec<Book> = query.build_query_as().fetch_all(self.pool).await?;
        let books = books.into_iter().map(Book::with_computed_price).collect();

        Ok(Page::new(books, total, params, default_per_page))
    }

    /// Featured storefront books, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn featured(&self, limit: i64) -> Result<Vec<Book>, RepositoryError> {
        let books: Vec<Book> = sqlx::query_as(&format!(
            "SELECT {BOOK_COLUMNS} FROM store.books \
             WHERE is_published AND is_available AND is_featured \
             ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(books.into_iter().map(Book::with_computed_price).collect())
    }

    /// Most recently added storefront books.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent(&self, limit: i64) -> Result<Vec<Book>, RepositoryError> {
        let books: Vec<Book> = sqlx::query_as(&format!(
            "SELECT {BOOK_COLUMNS} FROM store.books \
             WHERE is_published AND is_available \
             ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(books.into_iter().map(Book::with_computed_price).collect())
    }

    /// Get a book by its slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Book>, RepositoryError> {
        let book: Option<Book> = sqlx::query_as(&format!(
            "SELECT {BOOK_COLUMNS} FROM store.books WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(book.map(Book::with_computed_price))
    }

    /// Get a book by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: BookId) -> Result<Option<Book>, RepositoryError> {
        let book: Option<Book> =
            sqlx::query_as(&format!("SELECT {BOOK_COLUMNS} FROM store.books WHERE id = $1"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        Ok(book.map(Book::with_computed_price))
    }

    /// Record one more detail-page view.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn increment_views(&self, id: BookId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE store.books SET views_count = views_count + 1 WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Insert a new book. The slug is derived from the title.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` when the slug or ISBN collides,
    /// `RepositoryError::Database` otherwise.
    pub async fn create(&self, input: &BookInput) -> Result<Book, RepositoryError> {
        let slug = derive_slug(&input.title);

        let book: Book = sqlx::query_as(&format!(
            "INSERT INTO store.books \
               (title, slug, isbn, price, discount_price, pages, description, summary, \
                front_image_url, back_image_url, language, edition, publication_date, \
                is_published, is_available, is_featured, stock_quantity, \
                category_id, publisher_id, series_id, physical_format_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
                     $17, $18, $19, $20, $21) \
             RETURNING {BOOK_COLUMNS}"
        ))
        .bind(&input.title)
        .bind(&slug)
        .bind(&input.isbn)
        .bind(input.price)
        .bind(input.discount_price)
        .bind(input.pages)
        .bind(&input.description)
        .bind(&input.summary)
        .bind(&input.front_image_url)
        .bind(&input.back_image_url)
        .bind(&input.language)
        .bind(&input.edition)
        .bind(input.publication_date)
        .bind(input.is_published)
        .bind(input.is_available)
        .bind(input.is_featured)
        .bind(input.stock_quantity)
        .bind(input.category_id)
        .bind(input.publisher_id)
        .bind(input.series_id)
        .bind(input.physical_format_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx(e, "a book with this slug already exists"))?;

        Ok(book.with_computed_price())
    }

    /// Replace a book's fields. The slug is regenerated from the new title.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the book does not exist,
    /// `RepositoryError::Conflict` on slug collision.
    pub async fn update(&self, id: BookId, input: &BookInput) -> Result<Book, RepositoryError> {
        let slug = derive_slug(&input.title);

        let book: Option<Book> = sqlx::query_as(&format!(
            "UPDATE store.books SET \
               title = $2, slug = $3, isbn = $4, price = $5, discount_price = $6, pages = $7, \
               description = $8, summary = $9, front_image_url = $10, back_image_url = $11, \
               language = $12, edition = $13, publication_date = $14, is_published = $15, \
               is_available = $16, is_featured = $17, stock_quantity = $18, category_id = $19, \
               publisher_id = $20, series_id = $21, physical_format_id = $22, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {BOOK_COLUMNS}"
        ))
        .bind(id)
        .bind(&input.title)
        .bind(&slug)
        .bind(&input.isbn)
        .bind(input.price)
        .bind(input.discount_price)
        .bind(input.pages)
        .bind(&input.description)
        .bind(&input.summary)
        .bind(&input.front_image_url)
        .bind(&input.back_image_url)
        .bind(&input.language)
        .bind(&input.edition)
        .bind(input.publication_date)
        .bind(input.is_published)
        .bind(input.is_available)
        .bind(input.is_featured)
        .bind(input.stock_quantity)
        .bind(input.category_id)
        .bind(input.publisher_id)
        .bind(input.series_id)
        .bind(input.physical_format_id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx(e, "a book with this slug already exists"))?;

        book.map(Book::with_computed_price)
            .ok_or(RepositoryError::NotFound)
    }

    /// Delete a book.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row was deleted.
    pub async fn delete(&self, id: BookId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM store.books WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Replace the set of authors attached to a book.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn set_authors(
        &self,
        book_id: BookId,
        author_ids: &[AuthorId],
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM store.book_authors WHERE book_id = $1")
            .bind(book_id)
            .execute(self.pool)
            .await?;

        let ids: Vec<i32> = author_ids.iter().map(|id| id.as_i32()).collect();
        sqlx::query(
            "INSERT INTO store.book_authors (book_id, author_id) \
             SELECT $1, author_id FROM UNNEST($2::int4[]) AS t(author_id) \
             ON CONFLICT DO NOTHING",
        )
        .bind(book_id)
        .bind(&ids)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Replace the set of keywords attached to a book.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn set_keywords(
        &self,
        book_id: BookId,
        keyword_ids: &[KeywordId],
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM store.book_keywords WHERE book_id = $1")
            .bind(book_id)
            .execute(self.pool)
            .await?;

        let ids: Vec<i32> = keyword_ids.iter().map(|id| id.as_i32()).collect();
        sqlx::query(
            "INSERT INTO store.book_keywords (book_id, keyword_id) \
             SELECT $1, keyword_id FROM UNNEST($2::int4[]) AS t(keyword_id) \
             ON CONFLICT DO NOTHING",
        )
        .bind(book_id)
        .bind(&ids)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Authors attached to a book.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn authors_of(&self, book_id: BookId) -> Result<Vec<TaxonomyRef>, RepositoryError> {
        let refs = sqlx::query_as(
            "SELECT a.id, a.name, a.slug FROM store.authors a \
             JOIN store.book_authors ba ON ba.author_id = a.id \
             WHERE ba.book_id = $1 ORDER BY a.name",
        )
        .bind(book_id)
        .fetch_all(self.pool)
        .await?;
        Ok(refs)
    }

    /// Keywords attached to a book.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn keywords_of(&self, book_id: BookId) -> Result<Vec<TaxonomyRef>, RepositoryError> {
        let refs = sqlx::query_as(
            "SELECT k.id, k.name, k.slug FROM store.keywords k \
             JOIN store.book_keywords bk ON bk.keyword_id = k.id \
             WHERE bk.book_id = $1 ORDER BY k.name",
        )
        .bind(book_id)
        .fetch_all(self.pool)
        .await?;
        Ok(refs)
    }
}

/// Lock the given books `FOR UPDATE` inside an order transaction.
///
/// Rows come back ordered by id so concurrent transactions acquire locks in
/// the same order. Missing ids simply do not appear in the result; the
/// caller diffs against what it asked for.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_books_for_order(
    conn: &mut PgConnection,
    book_ids: &[BookId],
) -> Result<Vec<Book>, RepositoryError> {
    let ids: Vec<i32> = book_ids.iter().map(|id| id.as_i32()).collect();

    let books: Vec<Book> = sqlx::query_as(&format!(
        "SELECT {BOOK_COLUMNS} FROM store.books WHERE id = ANY($1) ORDER BY id FOR UPDATE"
    ))
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    Ok(books.into_iter().map(Book::with_computed_price).collect())
}

/// Apply the order-creation side effects to one book: decrement stock when
/// tracked, always increment the sales counter. The caller has already
/// verified sufficient stock under the row lock.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn apply_sale(
    conn: &mut PgConnection,
    book_id: BookId,
    quantity: i32,
    tracks_stock: bool,
) -> Result<(), RepositoryError> {
    if tracks_stock {
        sqlx::query(
            "UPDATE store.books SET stock_quantity = stock_quantity - $2, \
             sales_count = sales_count + $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(book_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;
    } else {
        sqlx::query(
            "UPDATE store.books SET sales_count = sales_count + $2, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(book_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Reverse the order-creation side effects on cancellation: restore stock,
/// reduce the sales counter (floored at zero).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn reverse_sale(
    conn: &mut PgConnection,
    book_id: BookId,
    quantity: i32,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "UPDATE store.books SET stock_quantity = stock_quantity + $2, \
         sales_count = GREATEST(sales_count - $2, 0), updated_at = NOW() WHERE id = $1",
    )
    .bind(book_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Push the WHERE clauses for a [`BookFilter`].
fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &BookFilter) {
    if filter.storefront_only {
        query.push(" AND is_published AND is_available");
    }
    if filter.featured_only {
        query.push(" AND is_featured");
    }
    if let Some(category) = filter.category {
        query.push(" AND category_id = ");
        query.push_bind(category.as_i32());
    }
    if let Some(author) = filter.author {
        query.push(" AND EXISTS (SELECT 1 FROM store.book_authors ba WHERE ba.book_id = store.books.id AND ba.author_id = ");
        query.push_bind(author.as_i32());
        query.push(")");
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        query.push(" AND title ILIKE ");
        query.push_bind(format!("%{search}%"));
    }
    if let Some(price_min) = filter.price_min {
        query.push(" AND price >= ");
        query.push_bind(price_min);
    }
    if let Some(price_max) = filter.price_max {
        query.push(" AND price <= ");
        query.push_bind(price_max);
    }
}

/// Derive a slug from a title, falling back to a generic stem for titles
/// that slugify to nothing (e.g., fully Arabic titles).
fn derive_slug(title: &str) -> String {
    let slug = slugify(title);
    if slug.is_empty() { "book".to_owned() } else { slug }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_column_whitelist() {
        assert_eq!(sort_column(Some("price")), "price");
        assert_eq!(sort_column(Some("title")), "title");
        // Anything off the whitelist falls back to created_at
        assert_eq!(sort_column(Some("password_hash; DROP TABLE")), "created_at");
        assert_eq!(sort_column(None), "created_at");
    }

    #[test]
    fn test_sort_direction() {
        assert_eq!(sort_direction(Some("asc")), "ASC");
        assert_eq!(sort_direction(Some("desc")), "DESC");
        assert_eq!(sort_direction(Some("sideways")), "DESC");
    }

    #[test]
    fn test_derive_slug_fallback() {
        assert_eq!(derive_slug("Droit Civil"), "droit-civil");
        assert_eq!(derive_slug("كتاب"), "book");
    }
}
