//! Account route handlers (all require a signed-in customer).

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use souq_core::{AddressId, OrderId, UserId, loyalty};

use crate::catalog::{CatalogAdapter, RemoteOrder};
use crate::db::{AddressRepository, LoyaltyRepository, OrderRepository, ProfileRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Address, AddressInput, LoyaltyTransaction, Order, OrderItem, Profile};
use crate::services::auth::AuthService;
use crate::state::AppState;

/// How many ledger rows the loyalty page shows.
const LEDGER_LIMIT: i64 = 100;

// =============================================================================
// Profile
// =============================================================================

/// GET /api/account
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Profile>> {
    Ok(Json(AuthService::new(state.pool()).get_profile(user.id).await?))
}

/// Profile update body.
#[derive(Debug, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// PATCH /api/account
#[instrument(skip(state, body), fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<ProfileUpdate>,
) -> Result<Json<Profile>> {
    let full_name = body.full_name.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let phone = body.phone.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let profile = ProfileRepository::new(state.pool())
        .update_details(user.id, full_name, phone)
        .await?;
    Ok(Json(profile))
}

// =============================================================================
// Loyalty
// =============================================================================

/// Balance plus ledger, newest first.
#[derive(Debug, Serialize)]
pub struct LoyaltySummary {
    pub balance: i32,
    pub transactions: Vec<LoyaltyTransaction>,
}

/// GET /api/account/loyalty
pub async fn loyalty(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<LoyaltySummary>> {
    loyalty_summary(&state, user.id).await
}

/// Redemption body.
#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub points: i32,
    #[serde(default)]
    pub order_number: Option<String>,
}

/// POST /api/account/loyalty/redeem
///
/// The balance check happens inside the stored function, so two concurrent
/// redemptions can never overdraw.
#[instrument(skip(state, body), fields(user_id = %user.id, points = body.points))]
pub async fn redeem(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<RedeemRequest>,
) -> Result<Json<LoyaltySummary>> {
    if body.points <= 0 {
        return Err(AppError::BadRequest("points must be positive".to_string()));
    }

    let description = loyalty::redemption_description(body.order_number.as_deref());
    let redeemed = LoyaltyRepository::new(state.pool())
        .redeem(user.id, None, body.points, &description)
        .await?;
    if !redeemed {
        return Err(AppError::Conflict("Insufficient loyalty points".to_string()));
    }

    tracing::info!("Points redeemed");
    loyalty_summary(&state, user.id).await
}

async fn loyalty_summary(state: &AppState, user_id: UserId) -> Result<Json<LoyaltySummary>> {
    let profile = AuthService::new(state.pool()).get_profile(user_id).await?;
    let transactions = LoyaltyRepository::new(state.pool())
        .history(user_id, LEDGER_LIMIT)
        .await?;
    Ok(Json(LoyaltySummary {
        balance: profile.loyalty_points,
        transactions,
    }))
}

// =============================================================================
// Orders
// =============================================================================

/// GET /api/account/orders
///
/// Orders mirrored locally from webhooks.
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(
        OrderRepository::new(state.pool())
            .list_for_user(user.id)
            .await?,
    ))
}

/// An order with its lines.
#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// GET /api/account/orders/{id}
pub async fn order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    let (order, items) = OrderRepository::new(state.pool())
        .get_for_user(user.id, id)
        .await?;
    Ok(Json(OrderDetail { order, items }))
}

/// GET /api/account/orders/remote
///
/// The catalog backend's own view of this customer's orders.
#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn remote_orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<RemoteOrder>>> {
    Ok(Json(
        state
            .catalog()
            .customer_orders(user.email.as_str())
            .await?,
    ))
}

// =============================================================================
// Addresses
// =============================================================================

/// GET /api/account/addresses
pub async fn addresses(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Address>>> {
    Ok(Json(AddressRepository::new(state.pool()).list(user.id).await?))
}

/// POST /api/account/addresses
pub async fn create_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(input): Json<AddressInput>,
) -> Result<(StatusCode, Json<Address>)> {
    validate_address(&input)?;
    let address = AddressRepository::new(state.pool())
        .create(user.id, &input)
        .await?;
    Ok((StatusCode::CREATED, Json(address)))
}

/// PATCH /api/account/addresses/{id}
pub async fn update_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
    Json(input): Json<AddressInput>,
) -> Result<Json<Address>> {
    validate_address(&input)?;
    let address = AddressRepository::new(state.pool())
        .update(user.id, id, &input)
        .await?;
    Ok(Json(address))
}

/// DELETE /api/account/addresses/{id}
pub async fn delete_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
) -> Result<StatusCode> {
    AddressRepository::new(state.pool())
        .delete(user.id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

fn validate_address(input: &AddressInput) -> Result<()> {
    let missing = input.address.missing_fields();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "address is missing: {}",
            missing.join(", ")
        )))
    }
}
