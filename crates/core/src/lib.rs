//! Dry Fruit Junction Core - Shared types library.
//!
//! This crate provides common types used across all storefront components:
//! - `storefront` - REST backend for the shop, the admin dashboard, and delivery partners
//! - `cli` - Command-line tools for migrations, account provisioning, and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, statuses, and roles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
