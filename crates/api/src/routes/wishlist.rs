//! Wishlist handlers.

use axum::extract::{Path, Query, State};
use axum::{Json, http::StatusCode};
use serde::{Deserialize, Serialize};

use maktaba_core::BookId;

use crate::db::{BookRepository, WishlistRepository};
use crate::error::ApiError;
use crate::middleware::auth::RequireUser;
use crate::models::book::Book;
use crate::pagination::{Page, PageParams};
use crate::state::AppState;

const DEFAULT_WISHLIST_PER_PAGE: u32 = 12;

/// Add-to-wishlist payload.
#[derive(Debug, Deserialize)]
pub struct AddToWishlistPayload {
    pub book_id: i32,
}

/// Response for the membership check endpoint.
#[derive(Debug, Serialize)]
pub struct WishlistCheck {
    pub in_wishlist: bool,
}

/// `GET /api/wishlist`
pub async fn index(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Query(page): Query<PageParams>,
) -> Result<Json<Page<Book>>, ApiError> {
    let books = WishlistRepository::new(state.pool())
        .list(current.id, page, DEFAULT_WISHLIST_PER_PAGE)
        .await?;
    Ok(Json(books))
}

/// `POST /api/wishlist`
pub async fn store(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Json(payload): Json<AddToWishlistPayload>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    let book_id = BookId::new(payload.book_id);
    let book = BookRepository::new(state.pool())
        .get_by_id(book_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("book {book_id} not found")))?;
    if !book.is_orderable() {
        return Err(ApiError::Conflict(format!(
            "book '{}' is not available",
            book.title
        )));
    }

    let inserted = WishlistRepository::new(state.pool())
        .add(current.id, book_id)
        .await?;
    let status = if inserted { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(book)))
}

/// `DELETE /api/wishlist/{book_id}`
pub async fn destroy(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Path(book_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    WishlistRepository::new(state.pool())
        .remove(current.id, BookId::new(book_id))
        .await
        .map_err(|err| match err {
            crate::db::RepositoryError::NotFound => {
                ApiError::NotFound("book not found in wishlist".to_owned())
            }
            other => other.into(),
        })?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/wishlist`
pub async fn clear(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
) -> Result<StatusCode, ApiError> {
    WishlistRepository::new(state.pool())
        .clear(current.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/wishlist/{book_id}/check`
pub async fn check(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Path(book_id): Path<i32>,
) -> Result<Json<WishlistCheck>, ApiError> {
    let in_wishlist = WishlistRepository::new(state.pool())
        .contains(current.id, BookId::new(book_id))
        .await?;
    Ok(Json(WishlistCheck { in_wishlist }))
}
