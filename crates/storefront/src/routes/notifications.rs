//! Notification bell and the notification dispatch endpoint.

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
};
use secrecy::ExposeSecret;
use serde::Serialize;
use tracing::instrument;

use souq_core::NotificationId;

use crate::db::NotificationRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::Notification;
use crate::services::notifications::{Delivery, Notice, Notifier};
use crate::state::AppState;

/// How many notifications the bell shows.
const LIST_LIMIT: i64 = 50;

/// Bell contents.
#[derive(Debug, Serialize)]
pub struct NotificationList {
    pub notifications: Vec<Notification>,
    pub unread: i64,
}

/// GET /api/notifications
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<NotificationList>> {
    let repo = NotificationRepository::new(state.pool());
    let notifications = repo.list(user.id, LIST_LIMIT).await?;
    let unread = repo.unread_count(user.id).await?;
    Ok(Json(NotificationList {
        notifications,
        unread,
    }))
}

/// POST /api/notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<NotificationId>,
) -> Result<StatusCode> {
    NotificationRepository::new(state.pool())
        .set_read(user.id, id, true)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/notifications/{id}/unread
pub async fn mark_unread(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<NotificationId>,
) -> Result<StatusCode> {
    NotificationRepository::new(state.pool())
        .set_read(user.id, id, false)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Result of marking everything read.
#[derive(Debug, Serialize)]
pub struct MarkAllRead {
    pub updated: u64,
}

/// POST /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<MarkAllRead>> {
    let updated = NotificationRepository::new(state.pool())
        .mark_all_read(user.id)
        .await?;
    Ok(Json(MarkAllRead { updated }))
}

/// POST /api/notifications/email
///
/// Server-to-server: renders and sends one templated email, and records an
/// in-app notification when `userId` is given. When `NOTIFY_API_KEY` is set
/// the caller must present it as a bearer token.
#[instrument(skip_all, fields(kind = ?notice.kind))]
pub async fn send_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(notice): Json<Notice>,
) -> Result<Json<Delivery>> {
    if let Some(key) = &state.config().notify_api_key {
        let presented = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if presented != Some(key.expose_secret()) {
            return Err(AppError::Unauthorized("Invalid API key".to_string()));
        }
    }

    Ok(Json(state.notifier().notify(&notice).await?))
}
