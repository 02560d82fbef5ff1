//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Customer accounts (email + password, Argon2id)
//! - `checkout` - Cart validation and order submission
//! - `reconcile` - Order webhook reconciliation and loyalty points
//! - `notifications` - In-app notifications plus transactional email
//! - `email` - Template rendering and SMTP delivery

pub mod auth;
pub mod checkout;
pub mod email;
pub mod notifications;
pub mod reconcile;
