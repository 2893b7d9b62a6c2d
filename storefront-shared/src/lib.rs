//! # Storefront Shared Library
//!
//! Domain types, persistence and business rules used by the Storefront
//! API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and their queries
//! - `workflow`: Cart aggregation, order placement and fulfillment
//! - `auth`: Password hashing, session tokens and the access gate
//! - `db`: Connection pool and migrations
//! - `storage`: Local upload directory

pub mod auth;
pub mod db;
pub mod models;
pub mod storage;
pub mod workflow;

/// Current version of the Storefront shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
