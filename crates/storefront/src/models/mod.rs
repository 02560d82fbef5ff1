//! Domain models for the storefront.
//!
//! Row types derive `sqlx::FromRow` and decode straight into the typed IDs,
//! statuses and `Email` from `souq-core`.

pub mod address;
pub mod loyalty;
pub mod notification;
pub mod order;
pub mod profile;
pub mod session;
pub mod wishlist;

pub use address::{Address, AddressInput};
pub use loyalty::{LoyaltyTransaction, OrderAward, OrderPointsState};
pub use notification::{NewNotification, Notification};
pub use order::{NewOrder, NewOrderItem, Order, OrderItem, OrderUpdate};
pub use profile::Profile;
pub use session::{CurrentUser, keys as session_keys};
pub use wishlist::{WishlistEntry, WishlistItem};
