//! Saved customer addresses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use souq_core::{AddressId, UserId};

use crate::catalog::PostalAddress;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub label: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postcode: Option<String>,
    pub country: String,
    pub phone: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Address> for PostalAddress {
    fn from(a: Address) -> Self {
        Self {
            first_name: a.first_name,
            last_name: a.last_name,
            address1: a.address1,
            address2: a.address2,
            city: a.city,
            state: a.state,
            postcode: a.postcode,
            country: a.country,
            phone: a.phone,
        }
    }
}

/// Create/update payload for an address.
#[derive(Debug, Clone, Deserialize)]
pub struct AddressInput {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(flatten)]
    pub address: PostalAddress,
    #[serde(default)]
    pub is_default: bool,
}
