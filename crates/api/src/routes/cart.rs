//! Shopping cart handlers.

use axum::extract::{Path, State};
use axum::{Json, http::StatusCode};
use serde::Deserialize;

use maktaba_core::{BookId, CartItemId};

use crate::db::{BookRepository, CartRepository};
use crate::error::ApiError;
use crate::middleware::auth::RequireUser;
use crate::models::cart::{CartItem, CartView};
use crate::state::AppState;

/// Add-to-cart payload.
#[derive(Debug, Deserialize)]
pub struct AddToCartPayload {
    pub book_id: i32,
    pub quantity: i32,
}

/// Quantity update payload.
#[derive(Debug, Deserialize)]
pub struct UpdateCartPayload {
    pub quantity: i32,
}

/// `GET /api/cart`
pub async fn index(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
) -> Result<Json<CartView>, ApiError> {
    let items = CartRepository::new(state.pool())
        .items_for_user(current.id)
        .await?;
    Ok(Json(CartView::from_items(items)))
}

/// `POST /api/cart`
pub async fn store(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Json(payload): Json<AddToCartPayload>,
) -> Result<(StatusCode, Json<CartItem>), ApiError> {
    if payload.quantity < 1 {
        return Err(ApiError::Validation("quantity must be at least 1".to_owned()));
    }

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

    let item = CartRepository::new(state.pool())
        .add(current.id, book_id, payload.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// `PUT /api/cart/{id}`
pub async fn update(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateCartPayload>,
) -> Result<Json<CartItem>, ApiError> {
    if payload.quantity < 1 {
        return Err(ApiError::Validation("quantity must be at least 1".to_owned()));
    }

    let item = CartRepository::new(state.pool())
        .update_quantity(current.id, CartItemId::new(id), payload.quantity)
        .await?;
    Ok(Json(item))
}

/// `DELETE /api/cart/{id}`
pub async fn destroy(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    CartRepository::new(state.pool())
        .remove(current.id, CartItemId::new(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/cart`
pub async fn clear(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
) -> Result<StatusCode, ApiError> {
    CartRepository::new(state.pool()).clear(current.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
