//! Back-office row and request types.
//!
//! Rows derive `sqlx::FromRow` and decode straight into `souq-core` IDs,
//! statuses and roles.

pub mod admin_user;
pub mod content;
pub mod customer;
pub mod order;
pub mod product;
pub mod session;

pub use admin_user::{AdminRole, AdminUser};
pub use content::{HeroSlide, HeroSlideInput, Setting};
pub use customer::{Customer, CustomerDetail, LoyaltyEntry, PointsAdjustment};
pub use order::{AdminOrder, AdminOrderItem, OrderDetail};
pub use product::{ImageUpload, Product, ProductImage, ProductInput, ProductWithImages};
pub use session::{CurrentAdmin, keys as session_keys};
