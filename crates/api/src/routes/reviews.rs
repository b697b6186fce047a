//! Review handlers: public submission, owner edits, staff moderation.

use axum::extract::{Path, Query, State};
use axum::{Json, http::StatusCode};
use serde::Deserialize;

use maktaba_core::{BookId, Email, ReviewId};

use crate::db::reviews::NewReview;
use crate::db::{BookRepository, ReviewRepository};
use crate::error::ApiError;
use crate::middleware::auth::{OptionalUser, RequireStaff, RequireUser};
use crate::models::review::Review;
use crate::pagination::{Page, PageParams};
use crate::state::AppState;

const DEFAULT_REVIEWS_PER_PAGE: u32 = 10;
const MAX_COMMENT_LENGTH: usize = 2000;

/// Query parameters for review listings.
#[derive(Debug, Default, Deserialize)]
pub struct ReviewListQuery {
    pub sort_order: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Review submission payload.
#[derive(Debug, Deserialize)]
pub struct StoreReviewPayload {
    pub rating: i32,
    pub title: Option<String>,
    pub comment: Option<String>,
    pub reviewer_name: String,
    pub reviewer_email: Option<String>,
}

/// Review edit payload.
#[derive(Debug, Deserialize)]
pub struct UpdateReviewPayload {
    pub rating: i32,
    pub title: Option<String>,
    pub comment: Option<String>,
}

fn validate_rating(rating: i32) -> Result<(), ApiError> {
    if !(1..=5).contains(&rating) {
        return Err(ApiError::Validation(
            "rating must be between 1 and 5".to_owned(),
        ));
    }
    Ok(())
}

fn validate_comment(comment: Option<&str>) -> Result<(), ApiError> {
    if comment.is_some_and(|c| c.len() > MAX_COMMENT_LENGTH) {
        return Err(ApiError::Validation(format!(
            "comment must be at most {MAX_COMMENT_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Resolve a book slug into its id, 404ing on a miss.
async fn resolve_book(state: &AppState, slug: &str) -> Result<BookId, ApiError> {
    BookRepository::new(state.pool())
        .get_by_slug(slug)
        .await?
        .map(|book| book.id)
        .ok_or_else(|| ApiError::NotFound(format!("book '{slug}' not found")))
}

/// `GET /api/books/{slug}/reviews`
pub async fn index(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<ReviewListQuery>,
) -> Result<Json<Page<Review>>, ApiError> {
    let book_id = resolve_book(&state, &slug).await?;

    let reviews = ReviewRepository::new(state.pool())
        .list_approved_for_book(
            book_id,
            query.sort_order.as_deref(),
            PageParams::new(query.page, query.per_page),
            DEFAULT_REVIEWS_PER_PAGE,
        )
        .await?;
    Ok(Json(reviews))
}

/// `POST /api/books/{slug}/reviews`
///
/// Open to guests; logged-in users get one review per book and a
/// verified-purchase badge when they have a shipped/delivered order
/// containing it. New reviews await moderation.
pub async fn store(
    State(state): State<AppState>,
    OptionalUser(current): OptionalUser,
    Path(slug): Path<String>,
    Json(payload): Json<StoreReviewPayload>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    validate_rating(payload.rating)?;
    validate_comment(payload.comment.as_deref())?;
    let reviewer_name = payload.reviewer_name.trim();
    if reviewer_name.is_empty() || reviewer_name.len() > 255 {
        return Err(ApiError::Validation(
            "reviewer_name is required and must be at most 255 characters".to_owned(),
        ));
    }
    if let Some(email) = payload.reviewer_email.as_deref() {
        Email::parse(email.trim())
            .map_err(|e| ApiError::Validation(format!("invalid reviewer_email: {e}")))?;
    }

    let book_id = resolve_book(&state, &slug).await?;

    let repo = ReviewRepository::new(state.pool());

    let mut is_verified_purchase = false;
    if let Some(current) = &current {
        if repo.user_has_reviewed(book_id, current.id).await? {
            return Err(ApiError::Conflict(
                "you have already reviewed this book".to_owned(),
            ));
        }
        is_verified_purchase = repo.user_has_purchased(book_id, current.id).await?;
    }

    let review = repo
        .create(&NewReview {
            book_id,
            user_id: current.map(|user| user.id),
            reviewer_name: reviewer_name.to_owned(),
            reviewer_email: payload.reviewer_email,
            rating: payload.rating,
            title: payload.title,
            comment: payload.comment,
            is_verified_purchase,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(review)))
}

/// `PUT /api/reviews/{id}` - edit one's own review; resets approval.
pub async fn update(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateReviewPayload>,
) -> Result<Json<Review>, ApiError> {
    validate_rating(payload.rating)?;
    validate_comment(payload.comment.as_deref())?;

    let repo = ReviewRepository::new(state.pool());
    let review = repo
        .get_by_id(ReviewId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("review not found".to_owned()))?;

    if review.user_id != Some(current.id) {
        return Err(ApiError::Forbidden);
    }

    let review = repo
        .update_content(
            review.id,
            payload.rating,
            payload.title.as_deref(),
            payload.comment.as_deref(),
        )
        .await?;
    Ok(Json(review))
}

/// `DELETE /api/reviews/{id}` - owner only (staff use the admin route).
pub async fn destroy(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let repo = ReviewRepository::new(state.pool());
    let review = repo
        .get_by_id(ReviewId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("review not found".to_owned()))?;

    if !current.is_staff && review.user_id != Some(current.id) {
        return Err(ApiError::Forbidden);
    }

    repo.delete(review.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/admin/reviews/pending`
pub async fn pending(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Query(page): Query<PageParams>,
) -> Result<Json<Page<Review>>, ApiError> {
    let reviews = ReviewRepository::new(state.pool())
        .pending(page, DEFAULT_REVIEWS_PER_PAGE)
        .await?;
    Ok(Json(reviews))
}

/// `PUT /api/admin/reviews/{id}/approve`
pub async fn approve(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Review>, ApiError> {
    let review = ReviewRepository::new(state.pool())
        .set_approved(ReviewId::new(id), true)
        .await?;
    Ok(Json(review))
}

/// `PUT /api/admin/reviews/{id}/unapprove`
pub async fn unapprove(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Review>, ApiError> {
    let review = ReviewRepository::new(state.pool())
        .set_approved(ReviewId::new(id), false)
        .await?;
    Ok(Json(review))
}

/// `DELETE /api/admin/reviews/{id}`
pub async fn admin_destroy(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    ReviewRepository::new(state.pool())
        .delete(ReviewId::new(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
