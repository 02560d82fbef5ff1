use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::Utc;
use serde_json::json;

use souq_core::{LoyaltyKind, OrderItemId, PaymentStatus};

use super::*;
use crate::models::OrderItem;
use crate::services::notifications::{Delivery, NotifyError};

// =============================================================================
// In-memory ledger
// =============================================================================

struct LedgerRow {
    order_id: OrderId,
    kind: LoyaltyKind,
    points: i32,
}

#[derive(Default)]
struct State {
    orders: Vec<Order>,
    items: Vec<OrderItem>,
    profiles: Vec<Profile>,
    rows: Vec<LedgerRow>,
}

#[derive(Default)]
struct MemoryLedger {
    state: Mutex<State>,
    /// Number of upcoming `find_order` calls that pretend the order is absent.
    stale_reads: AtomicUsize,
    /// Number of upcoming awarded inserts that fail and roll back.
    failing_awards: AtomicUsize,
}

impl MemoryLedger {
    fn with_profile(email: &str, balance: i32) -> Self {
        let ledger = Self::default();
        ledger.state.lock().unwrap().profiles.push(Profile {
            id: UserId::new(1),
            email: Email::parse(email).unwrap(),
            full_name: Some("Mona Salem".to_string()),
            phone: None,
            loyalty_points: balance,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        ledger
    }

    fn balance(&self) -> i32 {
        self.state.lock().unwrap().profiles[0].loyalty_points
    }

    fn order_count(&self) -> usize {
        self.state.lock().unwrap().orders.len()
    }

    fn item_count(&self) -> usize {
        self.state.lock().unwrap().items.len()
    }

    fn rows(&self, kind: LoyaltyKind) -> Vec<i32> {
        self.state
            .lock()
            .unwrap()
            .rows
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| r.points)
            .collect()
    }

    fn order(&self) -> Order {
        self.state.lock().unwrap().orders[0].clone()
    }

    fn adjust(&self, user_id: UserId, order_id: OrderId, kind: LoyaltyKind, delta: i32) -> i32 {
        let mut state = self.state.lock().unwrap();
        let profile = state
            .profiles
            .iter_mut()
            .find(|p| p.id == user_id)
            .unwrap();
        let before = profile.loyalty_points;
        profile.loyalty_points = (before + delta).max(0);
        let balance = profile.loyalty_points;
        state.rows.push(LedgerRow {
            order_id,
            kind,
            points: delta,
        });
        balance
    }
}

impl OrderLedger for MemoryLedger {
    async fn find_order(
        &self,
        source: OrderSource,
        number: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        if self
            .stale_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Ok(None);
        }
        Ok(self
            .state
            .lock()
            .unwrap()
            .orders
            .iter()
            .find(|o| o.source == source && o.external_order_number == number)
            .cloned())
    }

    async fn insert_order(
        &self,
        new: &NewOrder,
        award: Option<&OrderAward>,
    ) -> Result<Option<Order>, RepositoryError> {
        if award.is_some()
            && self
                .failing_awards
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            return Err(RepositoryError::NotFound);
        }

        let mut state = self.state.lock().unwrap();
        if state.orders.iter().any(|o| {
            o.source == new.source && o.external_order_number == new.external_order_number
        }) {
            return Ok(None);
        }

        let id = OrderId::new(i32::try_from(state.orders.len()).unwrap() + 1);
        let order = Order {
            id,
            source: new.source,
            external_order_number: new.external_order_number.clone(),
            user_id: new.user_id,
            email: new.email.clone(),
            status: new.status,
            payment_method: new.payment_method,
            payment_status: new.payment_status,
            total: new.total,
            currency: new.currency.clone(),
            billing_address: new.billing_address.clone(),
            shipping_address: new.shipping_address.clone(),
            tracking_number: new.tracking_number.clone(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        for item in &new.items {
            let item_id = OrderItemId::new(i32::try_from(state.items.len()).unwrap() + 1);
            state.items.push(OrderItem {
                id: item_id,
                order_id: id,
                product_id: item.product_id.clone(),
                variant_id: item.variant_id.clone(),
                title: item.title.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
            });
        }
        state.orders.push(order.clone());
        drop(state);

        if let Some(award) = award {
            self.adjust(award.user_id, id, LoyaltyKind::Earned, award.points);
        }
        Ok(Some(order))
    }

    async fn update_order(
        &self,
        id: OrderId,
        update: &OrderUpdate,
    ) -> Result<Order, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(RepositoryError::NotFound)?;
        order.status = update.status;
        order.payment_status = update.payment_status;
        order.tracking_number.clone_from(&update.tracking_number);
        Ok(order.clone())
    }

    async fn find_profile(&self, email: &Email) -> Result<Option<Profile>, RepositoryError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .profiles
            .iter()
            .find(|p| &p.email == email)
            .cloned())
    }

    async fn deduct_points(
        &self,
        user_id: UserId,
        order_id: OrderId,
        points: i32,
        _description: &str,
    ) -> Result<i32, RepositoryError> {
        Ok(self.adjust(user_id, order_id, LoyaltyKind::Deducted, -points))
    }

    async fn points_state(&self, order_id: OrderId) -> Result<OrderPointsState, RepositoryError> {
        let state = self.state.lock().unwrap();
        let has = |kind| {
            state
                .rows
                .iter()
                .any(|r| r.order_id == order_id && r.kind == kind)
        };
        Ok(OrderPointsState {
            earned: has(LoyaltyKind::Earned),
            deducted: has(LoyaltyKind::Deducted),
        })
    }
}

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<Notice>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    fn kinds(&self) -> Vec<NotificationKind> {
        self.sent.lock().unwrap().iter().map(|n| n.kind).collect()
    }

    fn take(&self) -> Vec<NotificationKind> {
        let kinds = self.kinds();
        self.sent.lock().unwrap().clear();
        kinds
    }
}

impl Notifier for RecordingNotifier {
    async fn notify(&self, notice: &Notice) -> Result<Delivery, NotifyError> {
        self.sent.lock().unwrap().push(notice.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Repository(RepositoryError::NotFound));
        }
        Ok(Delivery::default())
    }
}

fn payload(value: serde_json::Value) -> OrderPayload {
    serde_json::from_value(value).unwrap()
}

fn paid_order(total: &str) -> OrderPayload {
    payload(json!({
        "id": 450_789_469,
        "order_number": 1001,
        "email": "mona@example.com",
        "total_price": total,
        "currency": "EGP",
        "financial_status": "paid",
        "fulfillment_status": null,
        "customer": { "first_name": "Mona", "last_name": "Salem" },
        "line_items": [
            { "product_id": 7, "variant_id": 70, "title": "Kaftan", "variant_title": "M", "quantity": 1, "price": total }
        ]
    }))
}

const SOURCE: OrderSource = OrderSource::Storefront;

// =============================================================================
// Creation and idempotency
// =============================================================================

#[tokio::test]
async fn test_first_delivery_inserts_and_awards() {
    let ledger = MemoryLedger::with_profile("mona@example.com", 0);
    let notifier = RecordingNotifier::default();

    let outcome = reconcile(&ledger, &notifier, SOURCE, "orders/create", &paid_order("250.00"))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        ReconcileOutcome::Created {
            points_awarded: 2,
            status: OrderStatus::Pending,
            ..
        }
    ));
    assert_eq!(ledger.order_count(), 1);
    assert_eq!(ledger.item_count(), 1);
    assert_eq!(ledger.balance(), 2);
    assert_eq!(ledger.rows(LoyaltyKind::Earned), vec![2]);
    assert_eq!(ledger.order().user_id, Some(UserId::new(1)));
    assert_eq!(
        notifier.kinds(),
        vec![NotificationKind::OrderConfirmation, NotificationKind::PointsEarned]
    );
}

#[tokio::test]
async fn test_redelivery_changes_nothing() {
    let ledger = MemoryLedger::with_profile("mona@example.com", 0);
    let notifier = RecordingNotifier::default();
    let order = paid_order("250.00");

    reconcile(&ledger, &notifier, SOURCE, "orders/create", &order)
        .await
        .unwrap();
    notifier.take();

    for topic in ["orders/create", "orders/paid"] {
        let outcome = reconcile(&ledger, &notifier, SOURCE, topic, &order)
            .await
            .unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Unchanged { .. }));
    }

    assert_eq!(ledger.order_count(), 1);
    assert_eq!(ledger.item_count(), 1);
    assert_eq!(ledger.balance(), 2);
    assert_eq!(ledger.rows(LoyaltyKind::Earned).len(), 1);
    assert!(notifier.kinds().is_empty());
}

#[tokio::test]
async fn test_retry_after_failed_award_still_awards() {
    let ledger = MemoryLedger::with_profile("mona@example.com", 0);
    let notifier = RecordingNotifier::default();
    let order = paid_order("250.00");
    ledger.failing_awards.store(1, Ordering::SeqCst);

    let first = reconcile(&ledger, &notifier, SOURCE, "orders/create", &order).await;
    assert!(matches!(first, Err(ReconcileError::Repository(_))));
    assert_eq!(ledger.order_count(), 0);
    assert!(notifier.kinds().is_empty());

    let retry = reconcile(&ledger, &notifier, SOURCE, "orders/create", &order)
        .await
        .unwrap();

    assert!(matches!(
        retry,
        ReconcileOutcome::Created {
            points_awarded: 2,
            ..
        }
    ));
    assert_eq!(ledger.order_count(), 1);
    assert_eq!(ledger.balance(), 2);
    assert_eq!(ledger.rows(LoyaltyKind::Earned), vec![2]);
}

#[tokio::test]
async fn test_same_number_from_other_source_is_separate() {
    let ledger = MemoryLedger::with_profile("mona@example.com", 0);
    let notifier = RecordingNotifier::default();
    let order = paid_order("100.00");

    reconcile(&ledger, &notifier, OrderSource::Storefront, "orders/create", &order)
        .await
        .unwrap();
    reconcile(&ledger, &notifier, OrderSource::Catalog, "orders/create", &order)
        .await
        .unwrap();

    assert_eq!(ledger.order_count(), 2);
}

#[tokio::test]
async fn test_lost_insert_race_is_applied_as_update() {
    let ledger = MemoryLedger::with_profile("mona@example.com", 0);
    let notifier = RecordingNotifier::default();
    let order = paid_order("300.00");

    reconcile(&ledger, &notifier, SOURCE, "orders/create", &order)
        .await
        .unwrap();
    notifier.take();

    // The next lookup misses, as if both deliveries looked before either inserted.
    ledger.stale_reads.store(1, Ordering::SeqCst);
    let outcome = reconcile(&ledger, &notifier, SOURCE, "orders/paid", &order)
        .await
        .unwrap();

    assert!(matches!(outcome, ReconcileOutcome::Unchanged { .. }));
    assert_eq!(ledger.order_count(), 1);
    assert_eq!(ledger.balance(), 3);
    assert!(notifier.kinds().is_empty());
}

// =============================================================================
// Points rules
// =============================================================================

#[tokio::test]
async fn test_unpaid_order_earns_nothing() {
    let ledger = MemoryLedger::with_profile("mona@example.com", 0);
    let notifier = RecordingNotifier::default();
    let mut order = paid_order("500.00");
    order.financial_status = Some("pending".to_string());

    reconcile(&ledger, &notifier, SOURCE, "orders/create", &order)
        .await
        .unwrap();

    assert_eq!(ledger.balance(), 0);
    assert!(ledger.rows(LoyaltyKind::Earned).is_empty());
    assert_eq!(notifier.kinds(), vec![NotificationKind::OrderConfirmation]);
}

#[tokio::test]
async fn test_paid_later_does_not_award() {
    let ledger = MemoryLedger::with_profile("mona@example.com", 0);
    let notifier = RecordingNotifier::default();
    let mut order = paid_order("500.00");
    order.financial_status = Some("pending".to_string());

    reconcile(&ledger, &notifier, SOURCE, "orders/create", &order)
        .await
        .unwrap();
    order.financial_status = Some("paid".to_string());
    let outcome = reconcile(&ledger, &notifier, SOURCE, "orders/paid", &order)
        .await
        .unwrap();

    assert!(matches!(outcome, ReconcileOutcome::Updated { .. }));
    assert_eq!(ledger.order().payment_status, PaymentStatus::Paid);
    assert_eq!(ledger.balance(), 0);
}

#[tokio::test]
async fn test_small_total_writes_no_ledger_row() {
    let ledger = MemoryLedger::with_profile("mona@example.com", 0);
    let notifier = RecordingNotifier::default();

    reconcile(&ledger, &notifier, SOURCE, "orders/create", &paid_order("99.99"))
        .await
        .unwrap();

    assert!(ledger.rows(LoyaltyKind::Earned).is_empty());
    assert_eq!(notifier.kinds(), vec![NotificationKind::OrderConfirmation]);
}

#[tokio::test]
async fn test_guest_order_is_mirrored_without_points() {
    let ledger = MemoryLedger::with_profile("someone-else@example.com", 0);
    let notifier = RecordingNotifier::default();

    reconcile(&ledger, &notifier, SOURCE, "orders/create", &paid_order("400.00"))
        .await
        .unwrap();

    assert_eq!(ledger.order().user_id, None);
    assert_eq!(ledger.balance(), 0);
    let sent = notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].user_id, None);
    assert_eq!(sent[0].customer_name, "Mona Salem");
}

// =============================================================================
// Fulfillment and cancellation
// =============================================================================

#[tokio::test]
async fn test_fulfillment_notifies_once_with_tracking() {
    let ledger = MemoryLedger::with_profile("mona@example.com", 0);
    let notifier = RecordingNotifier::default();
    let mut order = paid_order("150.00");

    reconcile(&ledger, &notifier, SOURCE, "orders/create", &order)
        .await
        .unwrap();
    notifier.take();

    order.fulfillment_status = Some("fulfilled".to_string());
    order.fulfillments = vec![PayloadFulfillment {
        tracking_number: Some("EG123".to_string()),
        tracking_numbers: Vec::new(),
    }];

    let outcome = reconcile(&ledger, &notifier, SOURCE, "orders/fulfilled", &order)
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        ReconcileOutcome::Updated {
            status: OrderStatus::Fulfilled,
            ..
        }
    ));
    assert_eq!(ledger.order().tracking_number.as_deref(), Some("EG123"));
    {
        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, NotificationKind::OrderFulfilled);
        assert_eq!(sent[0].tracking_number.as_deref(), Some("EG123"));
    }
    notifier.take();

    let outcome = reconcile(&ledger, &notifier, SOURCE, "orders/fulfilled", &order)
        .await
        .unwrap();
    assert!(matches!(outcome, ReconcileOutcome::Unchanged { .. }));
    assert!(notifier.kinds().is_empty());
}

#[tokio::test]
async fn test_cancellation_reverses_points_once() {
    let ledger = MemoryLedger::with_profile("mona@example.com", 0);
    let notifier = RecordingNotifier::default();
    let order = paid_order("250.00");

    reconcile(&ledger, &notifier, SOURCE, "orders/create", &order)
        .await
        .unwrap();
    assert_eq!(ledger.balance(), 2);
    notifier.take();

    let outcome = reconcile(&ledger, &notifier, SOURCE, "orders/cancelled", &order)
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        ReconcileOutcome::Updated {
            status: OrderStatus::Cancelled,
            points_reversed: 2,
            ..
        }
    ));
    assert_eq!(ledger.balance(), 0);
    assert_eq!(ledger.rows(LoyaltyKind::Deducted), vec![-2]);
    assert_eq!(notifier.take(), vec![NotificationKind::OrderCancelled]);

    let outcome = reconcile(&ledger, &notifier, SOURCE, "orders/cancelled", &order)
        .await
        .unwrap();
    assert!(matches!(outcome, ReconcileOutcome::Unchanged { .. }));
    assert_eq!(ledger.rows(LoyaltyKind::Deducted).len(), 1);
    assert!(notifier.kinds().is_empty());
}

#[tokio::test]
async fn test_reversal_floors_balance_at_zero() {
    let ledger = MemoryLedger::with_profile("mona@example.com", 0);
    let notifier = RecordingNotifier::default();
    let order = paid_order("500.00");

    reconcile(&ledger, &notifier, SOURCE, "orders/create", &order)
        .await
        .unwrap();
    // Customer spent most of the points meanwhile.
    {
        let mut state = ledger.state.lock().unwrap();
        state.profiles[0].loyalty_points = 3;
    }

    reconcile(&ledger, &notifier, SOURCE, "orders/cancelled", &order)
        .await
        .unwrap();

    assert_eq!(ledger.balance(), 0);
}

#[tokio::test]
async fn test_cancelled_is_terminal() {
    let ledger = MemoryLedger::with_profile("mona@example.com", 0);
    let notifier = RecordingNotifier::default();
    let mut order = paid_order("250.00");

    reconcile(&ledger, &notifier, SOURCE, "orders/create", &order)
        .await
        .unwrap();
    reconcile(&ledger, &notifier, SOURCE, "orders/cancelled", &order)
        .await
        .unwrap();
    notifier.take();

    order.fulfillment_status = Some("fulfilled".to_string());
    reconcile(&ledger, &notifier, SOURCE, "orders/fulfilled", &order)
        .await
        .unwrap();

    assert_eq!(ledger.order().status, OrderStatus::Cancelled);
    assert!(notifier.kinds().is_empty());
    assert_eq!(ledger.balance(), 0);
}

#[tokio::test]
async fn test_created_already_cancelled_earns_nothing() {
    let ledger = MemoryLedger::with_profile("mona@example.com", 0);
    let notifier = RecordingNotifier::default();
    let mut order = paid_order("250.00");
    order.cancelled_at = Some("2026-03-01T09:00:00Z".to_string());

    reconcile(&ledger, &notifier, SOURCE, "orders/create", &order)
        .await
        .unwrap();

    assert_eq!(ledger.order().status, OrderStatus::Cancelled);
    assert_eq!(ledger.balance(), 0);
    assert_eq!(
        notifier.kinds(),
        vec![NotificationKind::OrderConfirmation, NotificationKind::OrderCancelled]
    );
}

// =============================================================================
// Edge cases
// =============================================================================

#[tokio::test]
async fn test_unknown_topic_is_ignored() {
    let ledger = MemoryLedger::with_profile("mona@example.com", 0);
    let notifier = RecordingNotifier::default();

    let outcome = reconcile(&ledger, &notifier, SOURCE, "orders/edited", &paid_order("250.00"))
        .await
        .unwrap();

    assert_eq!(outcome, ReconcileOutcome::Ignored);
    assert_eq!(ledger.order_count(), 0);
}

#[tokio::test]
async fn test_missing_number_is_invalid() {
    let ledger = MemoryLedger::default();
    let notifier = RecordingNotifier::default();

    let result = reconcile(&ledger, &notifier, SOURCE, "orders/create", &OrderPayload::default()).await;

    assert!(matches!(result, Err(ReconcileError::InvalidPayload(_))));
}

#[tokio::test]
async fn test_notification_failure_keeps_committed_state() {
    let ledger = MemoryLedger::with_profile("mona@example.com", 0);
    let notifier = RecordingNotifier::default();
    notifier.fail.store(true, Ordering::SeqCst);

    let outcome = reconcile(&ledger, &notifier, SOURCE, "orders/create", &paid_order("250.00"))
        .await
        .unwrap();

    assert!(matches!(outcome, ReconcileOutcome::Created { .. }));
    assert_eq!(ledger.order_count(), 1);
    assert_eq!(ledger.balance(), 2);
    assert_eq!(notifier.kinds().len(), 2);
}
