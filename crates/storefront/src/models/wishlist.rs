//! Wishlist entries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use souq_core::{UserId, WishlistItemId};

use crate::catalog::Product;

/// A saved product for a signed-in user.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WishlistItem {
    pub id: WishlistItemId,
    pub user_id: UserId,
    pub product_id: String,
    pub title: String,
    pub image_url: Option<String>,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A wishlist entry as exposed by the API and stored in guest sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistEntry {
    pub product_id: String,
    pub title: String,
    pub image_url: Option<String>,
    pub price: Decimal,
}

impl From<&Product> for WishlistEntry {
    fn from(p: &Product) -> Self {
        Self {
            product_id: p.id.clone(),
            title: p.title.clone(),
            image_url: p.images.first().map(|i| i.url.clone()),
            price: p.price,
        }
    }
}

impl From<WishlistItem> for WishlistEntry {
    fn from(item: WishlistItem) -> Self {
        Self {
            product_id: item.product_id,
            title: item.title,
            image_url: item.image_url,
            price: item.price,
        }
    }
}
