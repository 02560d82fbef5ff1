//! Session-related types.
//!
//! Types stored in the session for authentication and shopper state.

use serde::{Deserialize, Serialize};

use souq_core::{Email, UserId};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Profile ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Display name, if the user gave one.
    pub name: Option<String>,
}

/// Session keys. Each holds one JSON value.
pub mod keys {
    /// The logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Serialized cart lines.
    pub const CART: &str = "cart";

    /// Selected display currency code.
    pub const CURRENCY: &str = "currency";

    /// Selected interface language code.
    pub const LANGUAGE: &str = "language";

    /// Guest wishlist entries.
    pub const WISHLIST: &str = "wishlist";
}
