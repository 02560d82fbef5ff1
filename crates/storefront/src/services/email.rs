//! Transactional email.
//!
//! Uses SMTP via lettre for delivery with Askama templates. Every
//! notification kind has one HTML and one plain text template under
//! `templates/email/`.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use souq_core::{Email, NotificationKind};

use super::notifications::Notice;
use crate::config::EmailConfig;

// =============================================================================
// Templates
// =============================================================================

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    customer_name: &'a str,
    order_number: &'a str,
    order_total: Option<String>,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    customer_name: &'a str,
    order_number: &'a str,
    order_total: Option<String>,
}

#[derive(Template)]
#[template(path = "email/order_fulfilled.html")]
struct OrderFulfilledHtml<'a> {
    customer_name: &'a str,
    order_number: &'a str,
    tracking_number: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "email/order_fulfilled.txt")]
struct OrderFulfilledText<'a> {
    customer_name: &'a str,
    order_number: &'a str,
    tracking_number: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "email/order_cancelled.html")]
struct OrderCancelledHtml<'a> {
    customer_name: &'a str,
    order_number: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_cancelled.txt")]
struct OrderCancelledText<'a> {
    customer_name: &'a str,
    order_number: &'a str,
}

#[derive(Template)]
#[template(path = "email/points_earned.html")]
struct PointsEarnedHtml<'a> {
    customer_name: &'a str,
    order_number: &'a str,
    points: i32,
}

#[derive(Template)]
#[template(path = "email/points_earned.txt")]
struct PointsEarnedText<'a> {
    customer_name: &'a str,
    order_number: &'a str,
    points: i32,
}

#[derive(Template)]
#[template(path = "email/welcome.html")]
struct WelcomeHtml<'a> {
    customer_name: &'a str,
    store_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/welcome.txt")]
struct WelcomeText<'a> {
    customer_name: &'a str,
    store_url: &'a str,
}

/// Errors that can occur when rendering or sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// A rendered email ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Render the email for a notice.
///
/// Missing order fields render as empty strings; the notification endpoint
/// accepts whatever the caller sends.
///
/// # Errors
///
/// Returns `EmailError::Template` if a template fails to render.
pub fn render(notice: &Notice, store_url: &str) -> Result<RenderedEmail, EmailError> {
    let customer_name = notice.customer_name.as_str();
    let order_number = notice.order_number.as_deref().unwrap_or_default();

    let (subject, text, html) = match notice.kind {
        NotificationKind::OrderConfirmation => {
            let order_total = notice.order_total.map(|t| format!("{:.2}", t.round_dp(2)));
            (
                format!("Order #{order_number} confirmed"),
                OrderConfirmationText {
                    customer_name,
                    order_number,
                    order_total: order_total.clone(),
                }
                .render()?,
                OrderConfirmationHtml {
                    customer_name,
                    order_number,
                    order_total,
                }
                .render()?,
            )
        }
        NotificationKind::OrderFulfilled => {
            let tracking_number = notice.tracking_number.as_deref();
            (
                format!("Order #{order_number} is on its way"),
                OrderFulfilledText {
                    customer_name,
                    order_number,
                    tracking_number,
                }
                .render()?,
                OrderFulfilledHtml {
                    customer_name,
                    order_number,
                    tracking_number,
                }
                .render()?,
            )
        }
        NotificationKind::OrderCancelled => (
            format!("Order #{order_number} cancelled"),
            OrderCancelledText {
                customer_name,
                order_number,
            }
            .render()?,
            OrderCancelledHtml {
                customer_name,
                order_number,
            }
            .render()?,
        ),
        NotificationKind::PointsEarned => {
            let points = notice.loyalty_points.unwrap_or_default();
            (
                format!("You earned {points} loyalty points"),
                PointsEarnedText {
                    customer_name,
                    order_number,
                    points,
                }
                .render()?,
                PointsEarnedHtml {
                    customer_name,
                    order_number,
                    points,
                }
                .render()?,
            )
        }
        NotificationKind::Welcome => (
            "Welcome to Souq".to_string(),
            WelcomeText {
                customer_name,
                store_url,
            }
            .render()?,
            WelcomeHtml {
                customer_name,
                store_url,
            }
            .render()?,
        ),
    };

    Ok(RenderedEmail {
        subject,
        text,
        html,
    })
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send a rendered email.
    ///
    /// # Errors
    ///
    /// Returns error if the message cannot be built or delivered.
    pub async fn send(&self, to: &Email, email: &RenderedEmail) -> Result<(), EmailError> {
        self.send_multipart_email(to.as_str(), &email.subject, &email.text, &email.html)
            .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn notice(kind: NotificationKind) -> Notice {
        Notice {
            kind,
            email: Email::parse("layla@example.com").unwrap(),
            customer_name: "Layla".to_string(),
            order_number: Some("1042".to_string()),
            order_total: Some(Decimal::new(15000, 2)),
            loyalty_points: Some(1),
            tracking_number: Some("TRK-77".to_string()),
            user_id: None,
        }
    }

    #[test]
    fn test_confirmation_includes_order_and_total() {
        let email =
            render(&notice(NotificationKind::OrderConfirmation), "https://souq.test").unwrap();
        assert_eq!(email.subject, "Order #1042 confirmed");
        assert!(email.text.contains("#1042"));
        assert!(email.text.contains("150.00"));
        assert!(email.html.contains("<strong>150.00</strong>"));
    }

    #[test]
    fn test_fulfilled_includes_tracking_number() {
        let email = render(&notice(NotificationKind::OrderFulfilled), "https://souq.test").unwrap();
        assert!(email.text.contains("TRK-77"));
        assert!(email.html.contains("TRK-77"));
    }

    #[test]
    fn test_fulfilled_without_tracking_number() {
        let mut n = notice(NotificationKind::OrderFulfilled);
        n.tracking_number = None;
        let email = render(&n, "https://souq.test").unwrap();
        assert!(!email.text.contains("Tracking number"));
    }

    #[test]
    fn test_points_subject() {
        let email = render(&notice(NotificationKind::PointsEarned), "https://souq.test").unwrap();
        assert_eq!(email.subject, "You earned 1 loyalty points");
    }

    #[test]
    fn test_welcome_links_store() {
        let email = render(&notice(NotificationKind::Welcome), "https://souq.test").unwrap();
        assert!(email.text.contains("https://souq.test"));
        assert!(email.html.contains("Start shopping"));
    }

    #[test]
    fn test_html_escapes_customer_name() {
        let mut n = notice(NotificationKind::OrderCancelled);
        n.customer_name = "<script>".to_string();
        let email = render(&n, "https://souq.test").unwrap();
        assert!(!email.html.contains("<script>"));
        assert!(email.text.contains("<script>"));
    }
}
