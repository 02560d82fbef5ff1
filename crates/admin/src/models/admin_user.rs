//! Admin user domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use souq_core::{AdminUserId, Email};

// Re-export AdminRole from core for convenience
pub use souq_core::AdminRole;

/// A back-office account. The password hash is never part of this type.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AdminUser {
    pub id: AdminUserId,
    pub email: Email,
    pub name: String,
    pub role: AdminRole,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
