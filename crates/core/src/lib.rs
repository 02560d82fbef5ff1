//! Souq Core - Shared domain library.
//!
//! This crate provides the types and rules used across all Souq components:
//! - `storefront` - Public-facing shop API and order webhook
//! - `admin` - Back-office API
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. Everything here can be unit tested in isolation.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, money and status enums
//! - [`cart`] - Generic cart aggregation and derived totals
//! - [`loyalty`] - Loyalty point arithmetic

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod loyalty;
pub mod types;

pub use types::*;
