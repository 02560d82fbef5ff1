//! Customer profile.

use chrono::{DateTime, Utc};
use serde::Serialize;

use souq_core::{Email, UserId};

/// A customer profile with its denormalized loyalty balance.
///
/// `loyalty_points` only changes through the loyalty stored functions.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Profile {
    pub id: UserId,
    pub email: Email,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub loyalty_points: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Name used to greet the customer.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.email.local_part())
    }
}
