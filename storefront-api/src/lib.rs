//! # Storefront API Server Library
//!
//! HTTP surface of the storefront: configuration, error mapping, the
//! access gate and one handler per user action.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Access gate and security headers
//! - `routes`: Route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
