//! Registration, login, and profile handlers.

use axum::extract::State;
use axum::{Json, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;

use maktaba_core::Email;

use crate::db::UserRepository;
use crate::error::ApiError;
use crate::middleware::auth::{RequireUser, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::passwords::{hash_password, verify_password};
use crate::state::AppState;

const MIN_PASSWORD_LENGTH: usize = 8;

/// Registration payload.
#[derive(Debug, Deserialize)]
pub struct RegisterPayload {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

/// Login payload.
#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

/// Profile update payload.
#[derive(Debug, Deserialize)]
pub struct ProfilePayload {
    pub name: String,
    pub phone: Option<String>,
}

/// `POST /api/register`
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<RegisterPayload>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let name = payload.name.trim();
    if name.is_empty() || name.len() > 255 {
        return Err(ApiError::Validation(
            "name is required and must be at most 255 characters".to_owned(),
        ));
    }
    let email = Email::parse(payload.email.trim())
        .map_err(|e| ApiError::Validation(format!("invalid email: {e}")))?;
    if payload.password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = UserRepository::new(state.pool())
        .create(name, &email, &password_hash, payload.phone.as_deref(), false)
        .await?;

    let current = CurrentUser::from(&user);
    set_current_user(&session, &current)
        .await
        .map_err(|e| ApiError::Internal(format!("session error: {e}")))?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// `POST /api/login`
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<User>, ApiError> {
    let email = Email::parse(payload.email.trim())
        .map_err(|e| ApiError::Validation(format!("invalid email: {e}")))?;

    let Some((user, password_hash)) = UserRepository::new(state.pool())
        .get_auth_by_email(&email)
        .await?
    else {
        // Same error as a wrong password; don't leak which emails exist.
        return Err(ApiError::Unauthorized);
    };

    if !verify_password(&payload.password, &password_hash) {
        return Err(ApiError::Unauthorized);
    }

    let current = CurrentUser::from(&user);
    set_current_user(&session, &current)
        .await
        .map_err(|e| ApiError::Internal(format!("session error: {e}")))?;

    Ok(Json(user))
}

/// `POST /api/logout`
pub async fn logout(
    RequireUser(_user): RequireUser,
    session: Session,
) -> Result<StatusCode, ApiError> {
    clear_current_user(&session)
        .await
        .map_err(|e| ApiError::Internal(format!("session error: {e}")))?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/user`
pub async fn me(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
) -> Result<Json<User>, ApiError> {
    let user = UserRepository::new(state.pool())
        .get_by_id(current.id)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    Ok(Json(user))
}

/// `PUT /api/user/profile`
pub async fn update_profile(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Json(payload): Json<ProfilePayload>,
) -> Result<Json<User>, ApiError> {
    let name = payload.name.trim();
    if name.is_empty() || name.len() > 255 {
        return Err(ApiError::Validation(
            "name is required and must be at most 255 characters".to_owned(),
        ));
    }

    let user = UserRepository::new(state.pool())
        .update_profile(current.id, name, payload.phone.as_deref())
        .await?;
    Ok(Json(user))
}
