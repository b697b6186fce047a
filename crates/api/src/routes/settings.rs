//! Settings handlers.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::db::SettingsRepository;
use crate::error::ApiError;
use crate::middleware::auth::RequireStaff;
use crate::models::setting::Setting;
use crate::state::AppState;

/// Upsert payload for one setting row.
#[derive(Debug, Deserialize)]
pub struct SettingPayload {
    pub key: String,
    pub value: String,
    #[serde(default = "default_value_type")]
    pub value_type: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: bool,
}

fn default_value_type() -> String {
    "string".to_owned()
}

/// `GET /api/settings` - rows marked public.
pub async fn public_settings(
    State(state): State<AppState>,
) -> Result<Json<Vec<Setting>>, ApiError> {
    let settings = SettingsRepository::new(state.pool()).public().await?;
    Ok(Json(settings))
}

/// `GET /api/admin/settings` - every row.
pub async fn admin_settings(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<Vec<Setting>>, ApiError> {
    let settings = SettingsRepository::new(state.pool()).all().await?;
    Ok(Json(settings))
}

/// `PUT /api/admin/settings` - insert or update one row.
pub async fn admin_upsert(
    RequireStaff(_staff): RequireStaff,
    State(state): State<AppState>,
    Json(payload): Json<SettingPayload>,
) -> Result<Json<Setting>, ApiError> {
    let key = payload.key.trim();
    if key.is_empty() || key.len() > 100 {
        return Err(ApiError::Validation(
            "key is required and must be at most 100 characters".to_owned(),
        ));
    }

    let setting = SettingsRepository::new(state.pool())
        .upsert(
            key,
            &payload.value,
            &payload.value_type,
            payload.description.as_deref(),
            payload.is_public,
        )
        .await?;
    Ok(Json(setting))
}
