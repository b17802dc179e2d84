//! `PostgreSQL` implementation of the store traits.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use dryfruit_core::{OrderId, OrderStatus, ProductId, UserId};

use super::RepositoryError;
use super::activities::ActivityRepository;
use super::carts::CartRepository;
use super::counters::CounterRepository;
use super::orders::OrderRepository;
use super::products::ProductRepository;
use crate::models::{Activity, Cart, NewActivity, NewOrder, Order, Product};
use crate::store::{ActivityStore, CartStore, CatalogStore, CounterStore, OrderStore};

/// Store backed by the shared connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool, for repositories outside the store traits.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl CatalogStore for PgStore {
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        ProductRepository::new(&self.pool).get_by_id(id).await
    }
}

impl CartStore for PgStore {
    async fn find_cart(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        CartRepository::new(&self.pool).find_by_user(user_id).await
    }

    async fn save_cart(&self, cart: &Cart) -> Result<(), RepositoryError> {
        CartRepository::new(&self.pool).save(cart).await
    }
}

impl OrderStore for PgStore {
    async fn place_order(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        OrderRepository::new(&self.pool).place(&order).await
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        OrderRepository::new(&self.pool).get_by_id(id).await
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        OrderRepository::new(&self.pool).list_for_user(user_id).await
    }

    async fn all_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        OrderRepository::new(&self.pool).list_all().await
    }

    async fn orders_with_status(
        &self,
        statuses: &[OrderStatus],
    ) -> Result<Vec<Order>, RepositoryError> {
        OrderRepository::new(&self.pool)
            .list_with_status(statuses)
            .await
    }

    async fn set_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        delivered_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Order>, RepositoryError> {
        OrderRepository::new(&self.pool)
            .set_status(id, status, delivered_at)
            .await
    }
}

impl CounterStore for PgStore {
    async fn increment_and_get(&self, name: &str, start: i64) -> Result<i64, RepositoryError> {
        CounterRepository::new(&self.pool)
            .increment_and_get(name, start)
            .await
    }

    async fn current(&self, name: &str) -> Result<Option<i64>, RepositoryError> {
        CounterRepository::new(&self.pool).current(name).await
    }
}

impl ActivityStore for PgStore {
    async fn record(&self, activity: NewActivity) -> Result<(), RepositoryError> {
        ActivityRepository::new(&self.pool).record(&activity).await
    }

    async fn latest(&self, limit: i64) -> Result<Vec<Activity>, RepositoryError> {
        ActivityRepository::new(&self.pool).latest(limit).await
    }
}
