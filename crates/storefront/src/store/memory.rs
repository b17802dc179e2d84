//! In-memory store for service tests.
//!
//! All state sits behind one mutex, so `place_order` is atomic in the same
//! sense as the `PostgreSQL` transaction. Failures can be injected to check
//! that callers leave state untouched.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use dryfruit_core::{ActivityId, OrderId, OrderNumber, OrderStatus, ProductId, UserId};

use super::{ActivityStore, CartStore, CatalogStore, CounterStore, OrderStore};
use crate::db::RepositoryError;
use crate::models::order::{ORDER_NUMBER_COUNTER, ORDER_NUMBER_START};
use crate::models::{Activity, Cart, NewActivity, NewOrder, Order, Product};

#[derive(Default)]
struct State {
    products: HashMap<ProductId, Product>,
    carts: HashMap<UserId, Cart>,
    orders: Vec<Order>,
    counters: HashMap<String, i64>,
    activities: Vec<Activity>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_order_insert: AtomicBool,
    fail_cart_save: AtomicBool,
    fail_activity: AtomicBool,
}

fn injected(what: &str) -> RepositoryError {
    RepositoryError::Database(sqlx::Error::Protocol(format!("injected {what} failure")))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panicking test thread must not hide the state from the others
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn insert_product(&self, product: Product) {
        self.state().products.insert(product.id, product);
    }

    /// Mutate a stored product in place.
    pub fn edit_product(&self, id: ProductId, edit: impl FnOnce(&mut Product)) {
        if let Some(product) = self.state().products.get_mut(&id) {
            edit(product);
        }
    }

    pub fn cart(&self, user_id: UserId) -> Option<Cart> {
        self.state().carts.get(&user_id).cloned()
    }

    pub fn order_count(&self) -> usize {
        self.state().orders.len()
    }

    pub fn activities(&self) -> Vec<Activity> {
        self.state().activities.clone()
    }

    pub fn fail_order_insert(&self, fail: bool) {
        self.fail_order_insert.store(fail, Ordering::SeqCst);
    }

    pub fn fail_cart_save(&self, fail: bool) {
        self.fail_cart_save.store(fail, Ordering::SeqCst);
    }

    pub fn fail_activity(&self, fail: bool) {
        self.fail_activity.store(fail, Ordering::SeqCst);
    }
}

fn bump(counters: &mut HashMap<String, i64>, name: &str, start: i64) -> i64 {
    let seq = counters.entry(name.to_owned()).or_insert(start);
    *seq += 1;
    *seq
}

impl CatalogStore for MemoryStore {
    async fn find_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.state().products.get(&id).cloned())
    }
}

impl CartStore for MemoryStore {
    async fn find_cart(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        Ok(self.cart(user_id))
    }

    async fn save_cart(&self, cart: &Cart) -> Result<(), RepositoryError> {
        if self.fail_cart_save.load(Ordering::SeqCst) {
            return Err(injected("cart save"));
        }
        let mut stored = cart.clone();
        stored.updated_at = Some(Utc::now());
        self.state().carts.insert(cart.user_id, stored);
        Ok(())
    }
}

impl OrderStore for MemoryStore {
    async fn place_order(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let mut state = self.state();
        if self.fail_order_insert.load(Ordering::SeqCst) {
            return Err(injected("order insert"));
        }

        let id = i32::try_from(state.orders.len() + 1)
            .map_err(|_| RepositoryError::DataCorruption("order id overflow".to_owned()))?;
        let number = bump(&mut state.counters, ORDER_NUMBER_COUNTER, ORDER_NUMBER_START);
        let now = Utc::now();
        let placed = Order {
            id: OrderId::new(id),
            order_number: OrderNumber::new(number),
            user_id: order.user_id,
            customer: None,
            items: order.items,
            shipping_info: order.shipping_info,
            payment_info: order.payment_info,
            pricing: order.pricing,
            status: OrderStatus::Processing,
            delivered_at: None,
            created_at: now,
            updated_at: now,
        };
        state.orders.push(placed.clone());
        if let Some(cart) = state.carts.get_mut(&order.user_id) {
            cart.clear();
            cart.updated_at = Some(now);
        }

        Ok(placed)
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.state().orders.iter().find(|o| o.id == id).cloned())
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        Ok(self
            .state()
            .orders
            .iter()
            .rev()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn all_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        Ok(self.state().orders.iter().rev().cloned().collect())
    }

    async fn orders_with_status(
        &self,
        statuses: &[OrderStatus],
    ) -> Result<Vec<Order>, RepositoryError> {
        Ok(self
            .state()
            .orders
            .iter()
            .rev()
            .filter(|o| statuses.contains(&o.status))
            .cloned()
            .collect())
    }

    async fn set_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        delivered_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut state = self.state();
        let Some(order) = state.orders.iter_mut().find(|o| o.id == id) else {
            return Ok(None);
        };
        order.status = status;
        if delivered_at.is_some() {
            order.delivered_at = delivered_at;
        }
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }
}

impl CounterStore for MemoryStore {
    async fn increment_and_get(&self, name: &str, start: i64) -> Result<i64, RepositoryError> {
        Ok(bump(&mut self.state().counters, name, start))
    }

    async fn current(&self, name: &str) -> Result<Option<i64>, RepositoryError> {
        Ok(self.state().counters.get(name).copied())
    }
}

impl ActivityStore for MemoryStore {
    async fn record(&self, activity: NewActivity) -> Result<(), RepositoryError> {
        if self.fail_activity.load(Ordering::SeqCst) {
            return Err(injected("activity"));
        }
        let mut state = self.state();
        let id = i32::try_from(state.activities.len() + 1)
            .map_err(|_| RepositoryError::DataCorruption("activity id overflow".to_owned()))?;
        state.activities.push(Activity {
            id: ActivityId::new(id),
            kind: activity.kind,
            user_id: activity.user_id,
            user: None,
            description: activity.description,
            metadata: activity.metadata,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn latest(&self, limit: i64) -> Result<Vec<Activity>, RepositoryError> {
        let take = usize::try_from(limit).unwrap_or(0);
        Ok(self
            .state()
            .activities
            .iter()
            .rev()
            .take(take)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_counter_starts_after_start_value() {
        let store = MemoryStore::new();
        assert_eq!(store.current("visitors").await.unwrap(), None);
        assert_eq!(store.increment_and_get("visitors", 0).await.unwrap(), 1);
        assert_eq!(store.increment_and_get("visitors", 0).await.unwrap(), 2);
        assert_eq!(store.current("visitors").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_distinct_and_dense() {
        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..50)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .increment_and_get(ORDER_NUMBER_COUNTER, ORDER_NUMBER_START)
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut issued = Vec::new();
        for handle in handles {
            issued.push(handle.await.unwrap());
        }
        issued.sort_unstable();

        assert_eq!(issued, (1001..=1050).collect::<Vec<i64>>());
    }
}
