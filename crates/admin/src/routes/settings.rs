//! Site settings route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::Value as JsonValue;
use tracing::instrument;

use crate::db::SettingsRepository;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireWriter};
use crate::models::Setting;
use crate::state::AppState;

const MAX_KEY_LENGTH: usize = 100;

/// GET /api/settings
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Setting>>> {
    Ok(Json(SettingsRepository::new(state.pool()).list().await?))
}

/// GET /api/settings/{key}
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(key): Path<String>,
) -> Result<Json<Setting>> {
    check_key(&key)?;
    Ok(Json(SettingsRepository::new(state.pool()).get(&key).await?))
}

/// PUT /api/settings/{key}
///
/// The body is stored as-is, whatever JSON it is.
#[instrument(skip(state, admin, value), fields(admin_id = %admin.id))]
pub async fn put(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(key): Path<String>,
    Json(value): Json<JsonValue>,
) -> Result<Json<Setting>> {
    check_key(&key)?;
    let setting = SettingsRepository::new(state.pool()).put(&key, &value).await?;
    tracing::info!(key = %key, "Setting saved");
    Ok(Json(setting))
}

/// DELETE /api/settings/{key}
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireWriter(admin): RequireWriter,
    Path(key): Path<String>,
) -> Result<StatusCode> {
    check_key(&key)?;
    SettingsRepository::new(state.pool()).delete(&key).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn check_key(key: &str) -> Result<()> {
    if is_valid_key(key) {
        Ok(())
    } else {
        Err(AppError::BadRequest(
            "Setting keys are lowercase letters, digits, `_`, `-` and `.`".to_string(),
        ))
    }
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= MAX_KEY_LENGTH
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | '.'))
}
