//! Admin sign-in route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::db::AdminUserRepository;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAdmin, RequireSuperAdmin, clear_current_admin, set_current_admin};
use crate::models::{AdminUser, CurrentAdmin};
use crate::services::AdminAuthService;
use crate::state::AppState;

/// Login body.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /api/auth/login
#[instrument(skip(state, session, body), fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<CurrentAdmin>> {
    let user = AdminAuthService::new(state.pool())
        .login(&body.email, &body.password)
        .await?;

    let admin = CurrentAdmin::from(&user);
    set_current_admin(&session, &admin).await?;
    set_sentry_user(&admin.id, Some(admin.email.as_str()));

    tracing::info!(admin_id = %admin.id, role = %admin.role, "Admin signed in");
    Ok(Json(admin))
}

/// POST /api/auth/logout
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_admin(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/auth/me
pub async fn me(RequireAdmin(admin): RequireAdmin) -> Json<CurrentAdmin> {
    Json(admin)
}

/// Admin accounts list.
#[derive(Debug, Serialize)]
pub struct AdminUserList {
    pub admin_users: Vec<AdminUser>,
}

/// GET /api/admin-users (super admins only)
pub async fn admin_users(
    State(state): State<AppState>,
    RequireSuperAdmin(_admin): RequireSuperAdmin,
) -> Result<Json<AdminUserList>> {
    let admin_users = AdminUserRepository::new(state.pool()).list_all().await?;
    Ok(Json(AdminUserList { admin_users }))
}
