//! Business logic services for admin.
//!
//! # Services
//!
//! - `auth` - Email + password sign-in for back-office accounts
//! - `uploads` - Product image storage on local disk

pub mod auth;
pub mod uploads;

pub use auth::{AdminAuthError, AdminAuthService, hash_password};
pub use uploads::{ImageStore, UploadError};
