//! Dry Fruit Junction storefront library.
//!
//! The REST backend for the shop: catalog, carts, orders, accounts, and the
//! admin and delivery dashboards. Exposed as a library so the binary, the CLI,
//! and the tests share one implementation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
