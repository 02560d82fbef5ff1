//! Authentication route handlers.
//!
//! Email + password accounts. A successful login or registration stores
//! `CurrentUser` in the session and moves any guest wishlist into the
//! customer's saved list.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use souq_core::NotificationKind;

use crate::context::ShopContext;
use crate::db::WishlistRepository;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, Profile};
use crate::services::auth::AuthService;
use crate::services::notifications::{Notice, Notifier};
use crate::state::AppState;

/// Login body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Registration body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// POST /api/auth/register
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ctx: ShopContext,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Profile>)> {
    let profile = AuthService::new(state.pool())
        .register(&body.email, body.full_name.as_deref(), &body.password)
        .await?;

    tracing::info!(user_id = %profile.id, "Customer registered");
    sign_in(&state, &ctx, &profile).await?;

    let mut notice = Notice::new(
        NotificationKind::Welcome,
        profile.email.clone(),
        profile.display_name().to_string(),
    );
    notice.user_id = Some(profile.id);
    if let Err(e) = state.notifier().notify(&notice).await {
        tracing::warn!(error = %e, "Welcome notice failed");
    }

    Ok((StatusCode::CREATED, Json(profile)))
}

/// POST /api/auth/login
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ctx: ShopContext,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Profile>> {
    let profile = AuthService::new(state.pool())
        .login(&body.email, &body.password)
        .await?;

    sign_in(&state, &ctx, &profile).await?;
    Ok(Json(profile))
}

/// POST /api/auth/logout
pub async fn logout(ctx: ShopContext) -> Result<StatusCode> {
    clear_current_user(ctx.session()).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/auth/me
pub async fn me(RequireAuth(user): RequireAuth) -> Json<CurrentUser> {
    Json(user)
}

async fn sign_in(state: &AppState, ctx: &ShopContext, profile: &Profile) -> Result<()> {
    let user = CurrentUser {
        id: profile.id,
        email: profile.email.clone(),
        name: profile.full_name.clone(),
    };
    set_current_user(ctx.session(), &user).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    let guest = ctx.take_wishlist().await?;
    if !guest.is_empty() {
        let repo = WishlistRepository::new(state.pool());
        for entry in &guest {
            repo.add(user.id, entry).await?;
        }
        tracing::debug!(count = guest.len(), "Merged guest wishlist");
    }

    Ok(())
}
