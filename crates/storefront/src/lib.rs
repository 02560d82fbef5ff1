//! Souq Storefront library.
//!
//! The public shop API: catalog browsing, session cart and checkout,
//! customer accounts with loyalty points, notifications, and the order
//! webhook that keeps the local order mirror in sync. Exposed as a library
//! so the binary and the tests share one router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
