//! Notification dispatch: one email plus, for known customers, one in-app
//! notification row.

use std::future::Future;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use souq_core::{Email, NotificationId, NotificationKind, UserId};

use super::email::{self, EmailError, EmailService};
use crate::db::{NotificationRepository, RepositoryError};
use crate::models::NewNotification;

/// Something worth telling a customer about.
///
/// This is also the body of `POST /api/notifications/email`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub email: Email,
    pub customer_name: String,
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default)]
    pub order_total: Option<Decimal>,
    #[serde(default)]
    pub loyalty_points: Option<i32>,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub user_id: Option<UserId>,
}

impl Notice {
    /// A notice with no order details.
    #[must_use]
    pub const fn new(kind: NotificationKind, email: Email, customer_name: String) -> Self {
        Self {
            kind,
            email,
            customer_name,
            order_number: None,
            order_total: None,
            loyalty_points: None,
            tracking_number: None,
            user_id: None,
        }
    }

    /// Title and message for the in-app notification.
    #[must_use]
    pub fn headline(&self) -> (String, String) {
        let number = self.order_number.as_deref().unwrap_or_default();
        match self.kind {
            NotificationKind::OrderConfirmation => (
                "Order confirmed".to_string(),
                format!("We received your order #{number}."),
            ),
            NotificationKind::OrderFulfilled => (
                "Order shipped".to_string(),
                self.tracking_number.as_deref().map_or_else(
                    || format!("Your order #{number} is on its way."),
                    |t| format!("Your order #{number} is on its way. Tracking number: {t}."),
                ),
            ),
            NotificationKind::OrderCancelled => (
                "Order cancelled".to_string(),
                format!("Your order #{number} has been cancelled."),
            ),
            NotificationKind::PointsEarned => (
                "Points earned".to_string(),
                format!(
                    "You earned {} points on order #{number}.",
                    self.loyalty_points.unwrap_or_default()
                ),
            ),
            NotificationKind::Welcome => (
                "Welcome to Souq".to_string(),
                "Your account is ready. Paid orders earn loyalty points.".to_string(),
            ),
        }
    }

    /// Structured payload stored with the in-app notification.
    fn data(&self) -> serde_json::Value {
        serde_json::json!({
            "orderNumber": self.order_number,
            "orderTotal": self.order_total,
            "loyaltyPoints": self.loyalty_points,
            "trackingNumber": self.tracking_number,
        })
    }

    /// The in-app notification row for this notice, if it targets a known user.
    #[must_use]
    pub fn to_notification(&self) -> Option<NewNotification> {
        let user_id = self.user_id?;
        let (title, message) = self.headline();
        Some(NewNotification {
            user_id,
            kind: self.kind,
            title,
            message,
            data: self.data(),
        })
    }
}

/// Errors that can occur while delivering a notice.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("email delivery failed: {0}")]
    Email(#[from] EmailError),

    #[error("notification insert failed: {0}")]
    Repository(#[from] RepositoryError),
}

/// What a delivery actually did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub emailed: bool,
    pub notification_id: Option<NotificationId>,
}

/// Delivers notices. Callers treat failures as non-fatal.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice) -> impl Future<Output = Result<Delivery, NotifyError>> + Send;
}

/// The production notifier: SMTP email when configured, plus an in-app row.
pub struct Dispatcher<'a> {
    pool: &'a PgPool,
    email: Option<&'a EmailService>,
    store_url: &'a str,
}

impl<'a> Dispatcher<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, email: Option<&'a EmailService>, store_url: &'a str) -> Self {
        Self {
            pool,
            email,
            store_url,
        }
    }
}

impl Notifier for Dispatcher<'_> {
    #[instrument(skip(self, notice), fields(kind = ?notice.kind, email = %notice.email))]
    async fn notify(&self, notice: &Notice) -> Result<Delivery, NotifyError> {
        let in_app = async {
            let Some(new) = notice.to_notification() else {
                return Ok::<_, NotifyError>(None);
            };
            let row = NotificationRepository::new(self.pool).create(&new).await?;
            Ok(Some(row.id))
        };

        let mail = async {
            let Some(service) = self.email else {
                tracing::debug!("SMTP not configured, skipping email");
                return Ok::<_, NotifyError>(false);
            };
            let rendered = email::render(notice, self.store_url)?;
            service.send(&notice.email, &rendered).await?;
            Ok(true)
        };

        deliver(in_app, mail).await
    }
}

/// Attempt both channels. A failure on one never skips the other; the first
/// error is returned and any second one is logged.
async fn deliver<R, M>(in_app: R, mail: M) -> Result<Delivery, NotifyError>
where
    R: Future<Output = Result<Option<NotificationId>, NotifyError>>,
    M: Future<Output = Result<bool, NotifyError>>,
{
    let in_app = in_app.await;
    let mail = mail.await;

    match (in_app, mail) {
        (Ok(notification_id), Ok(emailed)) => Ok(Delivery {
            emailed,
            notification_id,
        }),
        (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
        (Err(e), Err(second)) => {
            tracing::warn!(error = %second, "Email delivery also failed");
            Err(e)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_failed_row_still_sends_email() {
        let emailed = AtomicBool::new(false);

        let result = deliver(
            async { Err(NotifyError::Repository(RepositoryError::NotFound)) },
            async {
                emailed.store(true, Ordering::SeqCst);
                Ok(true)
            },
        )
        .await;

        assert!(matches!(result, Err(NotifyError::Repository(_))));
        assert!(emailed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_both_channels_are_reported() {
        let delivery = deliver(async { Ok(Some(NotificationId::new(5))) }, async { Ok(true) })
            .await
            .unwrap();

        assert_eq!(
            delivery,
            Delivery {
                emailed: true,
                notification_id: Some(NotificationId::new(5)),
            }
        );
    }

    #[test]
    fn test_notice_deserializes_camel_case_body() {
        let notice: Notice = serde_json::from_value(serde_json::json!({
            "type": "order_fulfilled",
            "email": "Omar@Example.com",
            "customerName": "Omar",
            "orderNumber": "1001",
            "trackingNumber": "ZX-1",
            "userId": 4
        }))
        .unwrap();

        assert_eq!(notice.kind, NotificationKind::OrderFulfilled);
        assert_eq!(notice.email.as_str(), "omar@example.com");
        assert_eq!(notice.user_id, Some(UserId::new(4)));
        assert_eq!(notice.order_total, None);
    }

    #[test]
    fn test_notice_rejects_unknown_type() {
        let result = serde_json::from_value::<Notice>(serde_json::json!({
            "type": "newsletter",
            "email": "a@example.com",
            "customerName": "A"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_no_row_without_user() {
        let notice = Notice::new(
            NotificationKind::Welcome,
            Email::parse("a@example.com").unwrap(),
            "A".to_string(),
        );
        assert!(notice.to_notification().is_none());
    }

    #[test]
    fn test_row_carries_headline() {
        let mut notice = Notice::new(
            NotificationKind::PointsEarned,
            Email::parse("a@example.com").unwrap(),
            "A".to_string(),
        );
        notice.user_id = Some(UserId::new(9));
        notice.order_number = Some("77".to_string());
        notice.loyalty_points = Some(3);

        let row = notice.to_notification().unwrap();
        assert_eq!(row.user_id, UserId::new(9));
        assert_eq!(row.title, "Points earned");
        assert_eq!(row.message, "You earned 3 points on order #77.");
        assert_eq!(row.data["loyaltyPoints"], 3);
    }
}
