//! Order and loyalty reconciliation for platform webhooks.
//!
//! Every delivery is applied idempotently against the local order mirror:
//!
//! - The first delivery for `(source, order number)` inserts the order and
//!   its items. A concurrent duplicate loses the insert race and is applied
//!   as an update instead.
//! - Later deliveries only move status, payment status and tracking number.
//!   `Cancelled` is terminal.
//! - Points are awarded once, in the insert transaction, for paid orders of
//!   known customers. A failed award leaves no order behind, so the retry
//!   takes the insert path again.
//! - A cancelled order gives back the points it earned, exactly once.
//! - Notices go out only for real transitions, and their failures never
//!   undo committed state.

mod payload;
mod postgres;

use std::future::Future;

use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use souq_core::loyalty::{cancellation_description, earned_description, points_for_total};
use souq_core::{
    Email, NotificationKind, OrderId, OrderSource, OrderStatus, PaymentStatus, UserId,
};

pub use payload::{OrderPayload, PayloadCustomer, PayloadFulfillment, PayloadLine, Topic};
pub use postgres::PgLedger;

use super::notifications::{Notice, Notifier};
use crate::db::RepositoryError;
use crate::models::{NewOrder, Order, OrderAward, OrderPointsState, OrderUpdate, Profile};

/// Errors that can occur while reconciling a webhook delivery.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The payload lacks something needed to mirror the order.
    #[error("invalid order payload: {0}")]
    InvalidPayload(&'static str),

    /// Storage failed; the sender should retry.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Storage used by reconciliation.
pub trait OrderLedger: Send + Sync {
    fn find_order(
        &self,
        source: OrderSource,
        number: &str,
    ) -> impl Future<Output = Result<Option<Order>, RepositoryError>> + Send;

    /// Insert unless the order already exists, crediting `award` atomically
    /// with the insert. `None` means another delivery inserted it first.
    fn insert_order(
        &self,
        new: &NewOrder,
        award: Option<&OrderAward>,
    ) -> impl Future<Output = Result<Option<Order>, RepositoryError>> + Send;

    fn update_order(
        &self,
        id: OrderId,
        update: &OrderUpdate,
    ) -> impl Future<Output = Result<Order, RepositoryError>> + Send;

    fn find_profile(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Option<Profile>, RepositoryError>> + Send;

    /// Atomically subtract points (floored at zero) and append a `deducted`
    /// row. Returns the new balance.
    fn deduct_points(
        &self,
        user_id: UserId,
        order_id: OrderId,
        points: i32,
        description: &str,
    ) -> impl Future<Output = Result<i32, RepositoryError>> + Send;

    fn points_state(
        &self,
        order_id: OrderId,
    ) -> impl Future<Output = Result<OrderPointsState, RepositoryError>> + Send;
}

/// What a delivery did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Topic not handled.
    Ignored,
    Created {
        order_id: OrderId,
        status: OrderStatus,
        points_awarded: i32,
    },
    Updated {
        order_id: OrderId,
        status: OrderStatus,
        points_reversed: i32,
    },
    /// Redelivery with nothing new.
    Unchanged { order_id: OrderId },
}

/// Apply one webhook delivery.
///
/// # Errors
///
/// Returns `ReconcileError::InvalidPayload` when the order cannot be
/// identified, or `ReconcileError::Repository` when storage fails.
#[instrument(skip(ledger, notifier, payload), fields(number = tracing::field::Empty))]
pub async fn reconcile<L, N>(
    ledger: &L,
    notifier: &N,
    source: OrderSource,
    topic: &str,
    payload: &OrderPayload,
) -> Result<ReconcileOutcome, ReconcileError>
where
    L: OrderLedger,
    N: Notifier,
{
    let Some(topic) = Topic::parse(topic) else {
        tracing::info!(topic, "Ignoring unhandled webhook topic");
        return Ok(ReconcileOutcome::Ignored);
    };

    let number = payload
        .external_number()
        .ok_or(ReconcileError::InvalidPayload("missing order number"))?;
    tracing::Span::current().record("number", number.as_str());

    let status = payload.order_status(topic);

    if let Some(existing) = ledger.find_order(source, &number).await? {
        return apply_update(ledger, notifier, existing, status, payload).await;
    }

    let email = payload
        .customer_email()
        .ok_or(ReconcileError::InvalidPayload("missing customer email"))?;
    if payload.total_price.is_none() {
        return Err(ReconcileError::InvalidPayload("missing order total"));
    }

    let profile = ledger.find_profile(&email).await?;
    let new = payload.to_new_order(
        source,
        number.clone(),
        &email,
        profile.as_ref().map(|p| p.id),
        status,
    );

    let award = profile.as_ref().and_then(|profile| order_award(&new, profile.id));

    let Some(order) = ledger.insert_order(&new, award.as_ref()).await? else {
        tracing::info!("Order inserted concurrently, applying as update");
        let existing = ledger
            .find_order(source, &number)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        return apply_update(ledger, notifier, existing, status, payload).await;
    };

    tracing::info!(order_id = %order.id, status = ?order.status, "Order mirrored");

    let name = display_name(payload, profile.as_ref(), &email);
    let base = order_notice(&order, &email, &name);

    send(notifier, NotificationKind::OrderConfirmation, &base).await;
    match order.status {
        OrderStatus::Fulfilled => send(notifier, NotificationKind::OrderFulfilled, &base).await,
        OrderStatus::Cancelled => send(notifier, NotificationKind::OrderCancelled, &base).await,
        _ => {}
    }

    let mut points_awarded = 0;
    if let Some(award) = award {
        tracing::info!(user_id = %award.user_id, points = award.points, "Loyalty points awarded");
        points_awarded = award.points;

        let mut notice = base.clone();
        notice.loyalty_points = Some(award.points);
        send(notifier, NotificationKind::PointsEarned, &notice).await;
    }

    Ok(ReconcileOutcome::Created {
        order_id: order.id,
        status: order.status,
        points_awarded,
    })
}

async fn apply_update<L, N>(
    ledger: &L,
    notifier: &N,
    existing: Order,
    status: OrderStatus,
    payload: &OrderPayload,
) -> Result<ReconcileOutcome, ReconcileError>
where
    L: OrderLedger,
    N: Notifier,
{
    let update = OrderUpdate {
        status: if existing.status == OrderStatus::Cancelled {
            OrderStatus::Cancelled
        } else {
            status
        },
        payment_status: payload.payment_status(),
        tracking_number: payload
            .tracking_number()
            .or_else(|| existing.tracking_number.clone()),
    };

    let changed = update.changes(&existing);
    let previous = existing.status;
    let order = if changed {
        ledger.update_order(existing.id, &update).await?
    } else {
        existing
    };

    // Checked on every cancelled delivery so a retry after a failed
    // deduction still completes it.
    let points_reversed = if order.status == OrderStatus::Cancelled {
        reverse_points(ledger, &order).await?
    } else {
        0
    };

    if !changed && points_reversed == 0 {
        return Ok(ReconcileOutcome::Unchanged { order_id: order.id });
    }

    if order.status != previous {
        tracing::info!(order_id = %order.id, from = ?previous, to = ?order.status, "Order status changed");
        let kind = match order.status {
            OrderStatus::Fulfilled => Some(NotificationKind::OrderFulfilled),
            OrderStatus::Cancelled => Some(NotificationKind::OrderCancelled),
            _ => None,
        };
        if let Some(kind) = kind {
            match Email::parse(&order.email) {
                Ok(email) => {
                    let name = payload
                        .customer_name()
                        .unwrap_or_else(|| email.local_part().to_string());
                    send(notifier, kind, &order_notice(&order, &email, &name)).await;
                }
                Err(e) => tracing::warn!(error = %e, "Stored order email is invalid, skipping notice"),
            }
        }
    }

    Ok(ReconcileOutcome::Updated {
        order_id: order.id,
        status: order.status,
        points_reversed,
    })
}

/// Points a new order earns: paid, not cancelled and worth at least one point.
fn order_award(new: &NewOrder, user_id: UserId) -> Option<OrderAward> {
    let points = points_for_total(new.total);
    (new.payment_status == PaymentStatus::Paid
        && new.status != OrderStatus::Cancelled
        && points > 0)
        .then(|| OrderAward {
            user_id,
            points,
            description: earned_description(&new.external_order_number),
        })
}

/// Take back the points a cancelled order earned, if not done already.
async fn reverse_points<L: OrderLedger>(ledger: &L, order: &Order) -> Result<i32, ReconcileError> {
    let Some(user_id) = order.user_id else {
        return Ok(0);
    };
    if !ledger.points_state(order.id).await?.needs_reversal() {
        return Ok(0);
    }

    let points = points_for_total(order.total);
    if points <= 0 {
        return Ok(0);
    }

    let balance = ledger
        .deduct_points(
            user_id,
            order.id,
            points,
            &cancellation_description(&order.external_order_number),
        )
        .await?;
    tracing::info!(%user_id, points, balance, "Loyalty points reversed");
    Ok(points)
}

fn display_name(payload: &OrderPayload, profile: Option<&Profile>, email: &Email) -> String {
    payload
        .customer_name()
        .or_else(|| profile.map(|p| p.display_name().to_string()))
        .unwrap_or_else(|| email.local_part().to_string())
}

fn order_notice(order: &Order, email: &Email, name: &str) -> Notice {
    Notice {
        kind: NotificationKind::OrderConfirmation,
        email: email.clone(),
        customer_name: name.to_string(),
        order_number: Some(order.external_order_number.clone()),
        order_total: Some(order.total),
        loyalty_points: None,
        tracking_number: order.tracking_number.clone(),
        user_id: order.user_id,
    }
}

async fn send<N: Notifier>(notifier: &N, kind: NotificationKind, base: &Notice) {
    let notice = Notice {
        kind,
        ..base.clone()
    };
    if let Err(e) = notifier.notify(&notice).await {
        tracing::warn!(error = %e, ?kind, "Notification failed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests;
