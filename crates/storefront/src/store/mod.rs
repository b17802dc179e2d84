//! Persistence seams used by the cart and order services.
//!
//! The services are generic over these traits so the same logic runs against
//! `PostgreSQL` ([`crate::db::PgStore`]) in production and an in-memory store
//! in tests. Each trait mirrors one collaborator of the checkout workflow.

#[cfg(test)]
pub mod memory;

use std::future::Future;

use chrono::{DateTime, Utc};

use dryfruit_core::{OrderId, OrderStatus, ProductId, UserId};

use crate::db::RepositoryError;
use crate::models::{Activity, Cart, NewActivity, NewOrder, Order, Product};

/// Read access to the catalog.
pub trait CatalogStore: Send + Sync {
    /// Look up a product with all of its variants.
    fn find_product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<Option<Product>, RepositoryError>> + Send;
}

/// Whole-document cart persistence.
pub trait CartStore: Send + Sync {
    /// Load a user's cart, or `None` if they never had one.
    fn find_cart(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Option<Cart>, RepositoryError>> + Send;

    /// Write the cart back, replacing every stored line.
    fn save_cart(&self, cart: &Cart)
    -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Order persistence.
pub trait OrderStore: Send + Sync {
    /// Atomically issue an order number, persist the order with status
    /// `processing`, and empty the user's cart.
    ///
    /// On error none of the three effects is visible.
    fn place_order(
        &self,
        order: NewOrder,
    ) -> impl Future<Output = Result<Order, RepositoryError>> + Send;

    fn find_order(
        &self,
        id: OrderId,
    ) -> impl Future<Output = Result<Option<Order>, RepositoryError>> + Send;

    /// A user's orders, newest first.
    fn orders_for_user(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<Order>, RepositoryError>> + Send;

    /// Every order, newest first.
    fn all_orders(&self) -> impl Future<Output = Result<Vec<Order>, RepositoryError>> + Send;

    /// Orders currently in any of `statuses`, newest first.
    fn orders_with_status(
        &self,
        statuses: &[OrderStatus],
    ) -> impl Future<Output = Result<Vec<Order>, RepositoryError>> + Send;

    /// Set the status; `delivered_at` is stamped only when given.
    fn set_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        delivered_at: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<Option<Order>, RepositoryError>> + Send;
}

/// Named monotonically increasing counters.
pub trait CounterStore: Send + Sync {
    /// Atomically increment `name` and return the new value. A missing
    /// counter is created at `start`, so the first value is `start + 1`.
    fn increment_and_get(
        &self,
        name: &str,
        start: i64,
    ) -> impl Future<Output = Result<i64, RepositoryError>> + Send;

    /// Current value without incrementing.
    fn current(&self, name: &str)
    -> impl Future<Output = Result<Option<i64>, RepositoryError>> + Send;
}

/// Append-only audit log.
pub trait ActivityStore: Send + Sync {
    fn record(
        &self,
        activity: NewActivity,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// The most recent `limit` entries, newest first.
    fn latest(
        &self,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<Activity>, RepositoryError>> + Send;
}

/// Everything the checkout services need.
pub trait Store: CatalogStore + CartStore + OrderStore + CounterStore + ActivityStore {}

impl<T> Store for T where T: CatalogStore + CartStore + OrderStore + CounterStore + ActivityStore {}
