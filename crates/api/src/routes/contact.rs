//! Contact form and newsletter handlers.

use axum::extract::{Path, Query, State};
use axum::{Json, http::StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use maktaba_core::{ContactMessageId, Email};

use crate::db::ContactRepository;
use crate::error::ApiError;
use crate::middleware::auth::RequireStaff;
use crate::models::contact::{ContactMessage, Subscriber};
use crate::pagination::{Page, PageParams};
use crate::state::AppState;

const DEFAULT_MESSAGES_PER_PAGE: u32 = 15;
const DEFAULT_SUBSCRIBERS_PER_PAGE: u32 = 50;

/// Contact form payload.
#[derive(Debug, Deserialize)]
pub struct ContactPayload {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
}

/// Newsletter subscribe payload.
#[derive(Debug, Deserialize)]
pub struct SubscribePayload {
    pub email: String,
}

/// Newsletter unsubscribe payload: email or token, at least one.
#[derive(Debug, Deserialize)]
pub struct UnsubscribePayload {
    pub email: Option<String>,
    pub token: Option<Uuid>,
}

/// Simple acknowledgement body.
#[derive(Debug, Serialize)]
pub struct Acknowledgement {
    pub message: &'static str,
}

/// Query parameters for the admin message list.
#[derive(Debug, Default, Deserialize)]
pub struct MessageListQuery {
    #[serde(default)]
    pub unread: bool,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// `POST /api/contact`
pub async fn store(
    State(state): State<AppState>,
    Json(payload): Json<ContactPayload>,
) -> Result<(StatusCode, Json<Acknowledgement>), ApiError> {
    let name = payload.name.trim();
    if name.is_empty() || name.len() > 255 {
        return Err(ApiError::Validation(
            "name is required and must be at most 255 characters".to_owned(),
        ));
    }
    let email = Email::parse(payload.email.trim())
        .map_err(|e| ApiError::Validation(format!("invalid email: {e}")))?;
    let message = payload.message.trim();
    if message.is_empty() || message.len() > 5000 {
        return Err(ApiError::Validation(
            "message is required and must be at most 5000 characters".to_owned(),
        ));
    }

    ContactRepository::new(state.pool())
        .create_message(
            name,
            email.as_str(),
            payload.phone.as_deref(),
            payload.subject.as_deref(),
            message,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(Acknowledgement {
            message: "Message received. We will get back to you soon.",
        }),
    ))
}

/// `POST /api/newsletter/subscribe`
pub async fn subscribe(
    State(state): State<AppState>,
    Json(payload): Json<SubscribePayload>,
) -> Result<(StatusCode, Json<Acknowledgement>), ApiError> {
    let email = Email::parse(payload.email.trim())
        .map_err(|e| ApiError::Validation(format!("invalid email: {e}")))?;

    ContactRepository::new(state.pool())
        .subscribe(email.as_str())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(Acknowledgement {
            message: "Subscribed to the newsletter.",
        }),
    ))
}

/// `POST /api/newsletter/unsubscribe`
pub async fn unsubscribe(
    State(state): State<AppState>,
    Json(payload): Json<UnsubscribePayload>,
) -> Result<Json<Acknowledgement>, ApiError> {
    if payload.email.is_none() && payload.token.is_none() {
        return Err(ApiError::Validation(
            "either email or token is required".to_owned(),
        ));
    }

    ContactRepository::new(state.pool())
        .unsubscribe(payload.email.as_deref(), payload.token)
        .await
        .map_err(|err| match err {
            crate::db::RepositoryError::NotFound => {
                ApiError::NotFound("no active subscription found".to_owned())
            }
            other => other.into(),
        })?;

    Ok(Json(Acknowledgement {
        message: "Unsubscribed from the newsletter.",
    }))
}

/// `GET /api/admin/messages`
pub async fn admin_messages(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<MessageListQuery>,
) -> Result<Json<Page<ContactMessage>>, ApiError> {
    let messages = ContactRepository::new(state.pool())
        .list_messages(
            query.unread,
            PageParams::new(query.page, query.per_page),
            DEFAULT_MESSAGES_PER_PAGE,
        )
        .await?;
    Ok(Json(messages))
}

/// `GET /api/admin/messages/{id}`
pub async fn admin_show_message(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ContactMessage>, ApiError> {
    let message = ContactRepository::new(state.pool())
        .get_message(ContactMessageId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("message not found".to_owned()))?;
    Ok(Json(message))
}

/// `PUT /api/admin/messages/{id}/read`
pub async fn admin_mark_read(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ContactMessage>, ApiError> {
    let message = ContactRepository::new(state.pool())
        .set_read(ContactMessageId::new(id), true)
        .await?;
    Ok(Json(message))
}

/// `DELETE /api/admin/messages/{id}`
pub async fn admin_destroy_message(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    ContactRepository::new(state.pool())
        .delete_message(ContactMessageId::new(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/admin/newsletter/subscribers`
pub async fn admin_subscribers(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Query(page): Query<PageParams>,
) -> Result<Json<Page<Subscriber>>, ApiError> {
    let subscribers = ContactRepository::new(state.pool())
        .list_subscribers(page, DEFAULT_SUBSCRIBERS_PER_PAGE)
        .await?;
    Ok(Json(subscribers))
}
