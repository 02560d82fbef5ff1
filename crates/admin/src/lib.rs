//! Souq Admin library.
//!
//! The back-office API as a library, so the CLI can reuse its repositories
//! and password hashing and the routes can be tested.
//!
//! # Security
//!
//! This crate has write access to the catalog, orders and loyalty balances.
//! Serve it on an internal network only.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
