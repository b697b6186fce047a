//! Book catalog handlers.

use axum::extract::{Path, Query, State};
use axum::{Json, http::StatusCode};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use maktaba_core::{AuthorId, BookId, CategoryId, KeywordId};

use crate::db::books::{BookFilter, BookInput};
use crate::db::{BookRepository, ReviewRepository, TaxonomyKind, TaxonomyRepository};
use crate::error::ApiError;
use crate::middleware::auth::RequireStaff;
use crate::models::book::{Book, BookDetails};
use crate::pagination::{Page, PageParams};
use crate::state::AppState;

const DEFAULT_BOOKS_PER_PAGE: u32 = 12;
const EMBEDDED_REVIEWS_LIMIT: i64 = 10;

/// Query parameters for book listings.
#[derive(Debug, Default, Deserialize)]
pub struct BookListQuery {
    pub category: Option<i32>,
    pub author: Option<i32>,
    pub search: Option<String>,
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl BookListQuery {
    fn into_filter(self, storefront_only: bool) -> (BookFilter, PageParams) {
        (
            BookFilter {
                storefront_only,
                category: self.category.map(CategoryId::new),
                author: self.author.map(AuthorId::new),
                search: self.search,
                price_min: self.price_min,
                price_max: self.price_max,
                featured_only: false,
                sort_by: self.sort_by,
                sort_order: self.sort_order,
            },
            PageParams::new(self.page, self.per_page),
        )
    }
}

/// Limit query for featured/recent listings.
#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

/// Book create/update payload (staff).
#[derive(Debug, Deserialize)]
pub struct BookPayload {
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
    pub publication_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub stock_quantity: i32,
    pub category_id: Option<i32>,
    pub publisher_id: Option<i32>,
    pub series_id: Option<i32>,
    pub physical_format_id: Option<i32>,
    pub author_ids: Option<Vec<i32>>,
    pub keyword_ids: Option<Vec<i32>>,
}

const fn default_true() -> bool {
    true
}

impl BookPayload {
    fn validate(&self) -> Result<BookInput, ApiError> {
        let title = self.title.trim();
        if title.is_empty() || title.len() > 255 {
            return Err(ApiError::Validation(
                "title is required and must be at most 255 characters".to_owned(),
            ));
        }
        if self.price < Decimal::ZERO {
            return Err(ApiError::Validation("price must not be negative".to_owned()));
        }
        if let Some(discount) = self.discount_price {
            // A discount is an amount taken off the base price, so it must
            // leave a positive final price.
            if discount <= Decimal::ZERO || discount >= self.price {
                return Err(ApiError::Validation(
                    "discount_price must be positive and strictly less than price".to_owned(),
                ));
            }
        }
        if self.stock_quantity < 0 {
            return Err(ApiError::Validation(
                "stock_quantity must not be negative".to_owned(),
            ));
        }

        Ok(BookInput {
            title: title.to_owned(),
            isbn: self.isbn.clone(),
            price: self.price,
            discount_price: self.discount_price,
            pages: self.pages,
            description: self.description.clone(),
            summary: self.summary.clone(),
            front_image_url: self.front_image_url.clone(),
            back_image_url: self.back_image_url.clone(),
            language: self.language.clone(),
            edition: self.edition.clone(),
            publication_date: self.publication_date,
            is_published: self.is_published,
            is_available: self.is_available,
            is_featured: self.is_featured,
            stock_quantity: self.stock_quantity,
            category_id: self.category_id,
            publisher_id: self.publisher_id,
            series_id: self.series_id,
            physical_format_id: self.physical_format_id,
        })
    }
}

/// `GET /api/books`
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<BookListQuery>,
) -> Result<Json<Page<Book>>, ApiError> {
    let (filter, page) = query.into_filter(true);
    let books = BookRepository::new(state.pool())
        .list(&filter, page, DEFAULT_BOOKS_PER_PAGE)
        .await?;
    Ok(Json(books))
}

/// `GET /api/books/featured`
pub async fn featured(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<Book>>, ApiError> {
    let limit = query.limit.unwrap_or(8).clamp(1, 50);
    let books = BookRepository::new(state.pool()).featured(limit).await?;
    Ok(Json(books))
}

/// `GET /api/books/recent`
pub async fn recent(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<Book>>, ApiError> {
    let limit = query.limit.unwrap_or(6).clamp(1, 50);
    let books = BookRepository::new(state.pool()).recent(limit).await?;
    Ok(Json(books))
}

/// `GET /api/books/{slug}`
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<BookDetails>, ApiError> {
    let repo = BookRepository::new(state.pool());
    let book = repo
        .get_by_slug(&slug)
        .await?
        .filter(Book::is_orderable)
        .ok_or_else(|| ApiError::NotFound(format!("book '{slug}' not found")))?;

    repo.increment_views(book.id).await?;
    let details = load_details(&state, book).await?;
    Ok(Json(details))
}

/// `GET /api/admin/books`
pub async fn admin_index(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<BookListQuery>,
) -> Result<Json<Page<Book>>, ApiError> {
    let (filter, page) = query.into_filter(false);
    let books = BookRepository::new(state.pool())
        .list(&filter, page, DEFAULT_BOOKS_PER_PAGE)
        .await?;
    Ok(Json(books))
}

/// `GET /api/admin/books/{id}`
pub async fn admin_show(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<BookDetails>, ApiError> {
    let book = BookRepository::new(state.pool())
        .get_by_id(BookId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("book {id} not found")))?;
    let details = load_details(&state, book).await?;
    Ok(Json(details))
}

/// `POST /api/admin/books`
pub async fn store(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Json(payload): Json<BookPayload>,
) -> Result<(StatusCode, Json<BookDetails>), ApiError> {
    let input = payload.validate()?;
    let repo = BookRepository::new(state.pool());
    let book = repo.create(&input).await?;

    sync_relations(&repo, book.id, &payload).await?;

    let details = load_details(&state, book).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

/// `PUT /api/admin/books/{id}`
pub async fn update(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<BookPayload>,
) -> Result<Json<BookDetails>, ApiError> {
    let input = payload.validate()?;
    let repo = BookRepository::new(state.pool());
    let book = repo.update(BookId::new(id), &input).await?;

    sync_relations(&repo, book.id, &payload).await?;

    let details = load_details(&state, book).await?;
    Ok(Json(details))
}

/// `DELETE /api/admin/books/{id}`
pub async fn destroy(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    BookRepository::new(state.pool())
        .delete(BookId::new(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Replace pivot rows when the payload carries explicit id lists.
async fn sync_relations(
    repo: &BookRepository<'_>,
    book_id: BookId,
    payload: &BookPayload,
) -> Result<(), ApiError> {
    if let Some(author_ids) = &payload.author_ids {
        let ids: Vec<AuthorId> = author_ids.iter().copied().map(AuthorId::new).collect();
        repo.set_authors(book_id, &ids).await?;
    }
    if let Some(keyword_ids) = &payload.keyword_ids {
        let ids: Vec<KeywordId> = keyword_ids.iter().copied().map(KeywordId::new).collect();
        repo.set_keywords(book_id, &ids).await?;
    }
    Ok(())
}

/// Load a book's relations and recent approved reviews.
async fn load_details(state: &AppState, book: Book) -> Result<BookDetails, ApiError> {
    let pool = state.pool();
    let repo = BookRepository::new(pool);

    let category = match book.category_id {
        Some(id) => {
            TaxonomyRepository::new(pool, TaxonomyKind::Category)
                .get_ref(id.as_i32())
                .await?
        }
        None => None,
    };
    let publisher = match book.publisher_id {
        Some(id) => {
            TaxonomyRepository::new(pool, TaxonomyKind::Publisher)
                .get_ref(id.as_i32())
                .await?
        }
        None => None,
    };
    let series = match book.series_id {
        Some(id) => {
            TaxonomyRepository::new(pool, TaxonomyKind::Series)
                .get_ref(id.as_i32())
                .await?
        }
        None => None,
    };
    let physical_format = match book.physical_format_id {
        Some(id) => {
            TaxonomyRepository::new(pool, TaxonomyKind::PhysicalFormat)
                .get_ref(id.as_i32())
                .await?
        }
        None => None,
    };

    let authors = repo.authors_of(book.id).await?;
    let keywords = repo.keywords_of(book.id).await?;
    let reviews = ReviewRepository::new(pool)
        .recent_approved_for_book(book.id, EMBEDDED_REVIEWS_LIMIT)
        .await?;

    let discount_percentage = book.discount_percentage();
    Ok(BookDetails {
        book,
        discount_percentage,
        category,
        publisher,
        series,
        physical_format,
        authors,
        keywords,
        reviews,
    })
}
