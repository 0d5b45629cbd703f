//! Ecommerce Core - Shared domain types.
//!
//! This crate provides the types shared by the API server and the CLI:
//! - `api` - JSON REST backend (accounts, catalog, orders, payments)
//! - `cli` - Migrations and operator tooling
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Database encodings are behind the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, roles, order statuses and slugs

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
