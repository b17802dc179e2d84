//! Order creation and the fulfillment status lifecycle.
//!
//! Creating an order re-resolves every cart line against the live catalog,
//! prices the snapshot, and hands the result to
//! [`OrderStore::place_order`], which numbers the order, persists it, and
//! empties the cart as one atomic step.

use std::collections::HashMap;

use chrono::Utc;
use serde_json::json;
use tracing::instrument;

use dryfruit_core::{
    ActivityKind, OrderId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, Role,
};

use super::{ServiceError, activity, require_admin};
use crate::models::order::SHIPPING_PRICE;
use crate::models::{
    Caller, NewActivity, NewOrder, Order, OrderDetail, OrderItem, OrderItemView, OrderPricing,
    PaymentInfo, Product, ShippingInfo,
};
use crate::store::Store;

/// Order operations.
pub struct OrderService<'a, S> {
    store: &'a S,
}

impl<'a, S: Store> OrderService<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Convert the caller's cart into an order.
    ///
    /// Prices come from the live variants, never from the cart's cached
    /// snapshot. Stock is not decremented.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidArgument` if the shipping info is invalid.
    /// Returns `ServiceError::EmptyCart` if the cart is missing or has no lines.
    /// Returns `ServiceError::NotFound` if a line's product or variant no
    /// longer exists.
    /// Returns `ServiceError::Persistence` if the order can't be placed; the
    /// cart is unchanged in that case.
    #[instrument(skip(self, shipping_info), fields(user_id = %caller.user_id))]
    pub async fn create_order(
        &self,
        caller: &Caller,
        shipping_info: &ShippingInfo,
        payment_method: PaymentMethod,
    ) -> Result<Order, ServiceError> {
        let shipping_info = shipping_info
            .validated()
            .map_err(ServiceError::InvalidArgument)?;

        let cart = self
            .store
            .find_cart(caller.user_id)
            .await?
            .filter(|c| !c.is_empty())
            .ok_or(ServiceError::EmptyCart)?;

        let mut products: HashMap<ProductId, Product> = HashMap::new();
        let mut items = Vec::with_capacity(cart.items.len());
        for line in &cart.items {
            if !products.contains_key(&line.product_id) {
                let product = self
                    .store
                    .find_product(line.product_id)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::not_found(format!("product {}", line.product_id))
                    })?;
                products.insert(line.product_id, product);
            }
            let Some(product) = products.get(&line.product_id) else {
                return Err(ServiceError::not_found(format!("product {}", line.product_id)));
            };
            let variant = product.variant(line.variant_id).ok_or_else(|| {
                ServiceError::not_found(format!("variant {}", line.variant_id))
            })?;

            items.push(OrderItem {
                product_id: product.id,
                variant_id: variant.id,
                name: product.name.clone(),
                quantity: line.quantity,
                price: variant.price,
                weight: variant.weight.clone(),
                images: product.images.clone(),
            });
        }

        let pricing = OrderPricing::for_items(&items, SHIPPING_PRICE)?;
        let order = self
            .store
            .place_order(NewOrder {
                user_id: caller.user_id,
                items,
                shipping_info,
                payment_info: PaymentInfo {
                    method: payment_method,
                    status: PaymentStatus::Pending,
                },
                pricing,
            })
            .await?;

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.pricing.total_price,
            "Order placed"
        );
        activity::record(
            self.store,
            NewActivity::new(
                ActivityKind::OrderPlaced,
                caller.user_id,
                format!("Order {} placed", order.order_number),
            )
            .with_metadata(json!({
                "orderId": order.id,
                "orderNumber": order.order_number,
                "totalPrice": order.pricing.total_price,
            })),
        )
        .await;

        Ok(order)
    }

    /// Move an order to `status`.
    ///
    /// Any allow-listed status is accepted regardless of the current one.
    /// Moving to `delivered` stamps `delivered_at`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthorized` unless the caller is an admin or
    /// delivery partner.
    /// Returns `ServiceError::InvalidArgument` if `status` isn't an allowed
    /// value.
    /// Returns `ServiceError::NotFound` if the order doesn't exist.
    #[instrument(skip(self), fields(user_id = %caller.user_id, role = %caller.role))]
    pub async fn update_status(
        &self,
        caller: &Caller,
        order_id: OrderId,
        status: &str,
    ) -> Result<Order, ServiceError> {
        if !caller.has_any_role(Role::ORDER_STATUS_EDITORS) {
            return Err(ServiceError::Unauthorized(
                "only admins and delivery partners can change order status".to_owned(),
            ));
        }
        let status: OrderStatus = status
            .parse()
            .map_err(|e: dryfruit_core::ParseEnumError| {
                ServiceError::InvalidArgument(e.to_string())
            })?;

        let delivered_at = (status == OrderStatus::Delivered).then(Utc::now);
        let order = self
            .store
            .set_status(order_id, status, delivered_at)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("order {order_id}")))?;

        tracing::info!(order_id = %order.id, %status, "Order status changed");
        if let Some(kind) = ActivityKind::for_order_status(status) {
            activity::record(
                self.store,
                NewActivity::new(
                    kind,
                    caller.user_id,
                    format!("Order {} marked {status}", order.order_number),
                )
                .with_metadata(json!({ "orderId": order.id, "status": status })),
            )
            .await;
        }

        Ok(order)
    }

    /// Admin shortcut that marks an order delivered.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthorized` unless the caller is an admin.
    /// Returns `ServiceError::NotFound` if the order doesn't exist.
    pub async fn mark_delivered(
        &self,
        caller: &Caller,
        order_id: OrderId,
    ) -> Result<Order, ServiceError> {
        require_admin(caller, "mark orders delivered")?;
        self.update_status(caller, order_id, OrderStatus::Delivered.as_str())
            .await
    }

    /// A single order, visible to its owner and to admins.
    ///
    /// Each line carries the variant as currently listed in the catalog.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the order doesn't exist.
    /// Returns `ServiceError::Unauthorized` if the caller may not see it.
    pub async fn get_order(
        &self,
        caller: &Caller,
        order_id: OrderId,
    ) -> Result<OrderDetail, ServiceError> {
        let order = self
            .store
            .find_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("order {order_id}")))?;

        if order.user_id != caller.user_id && !caller.is_admin() {
            return Err(ServiceError::Unauthorized(
                "this order belongs to another customer".to_owned(),
            ));
        }

        let mut products: HashMap<ProductId, Option<Product>> = HashMap::new();
        for item in &order.items {
            if !products.contains_key(&item.product_id) {
                let product = self.store.find_product(item.product_id).await?;
                products.insert(item.product_id, product);
            }
        }
        Ok(order.map_items(|item| {
            let product = products.get(&item.product_id).and_then(Option::as_ref);
            OrderItemView::resolve(item, product)
        }))
    }

    /// The caller's own order history, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Persistence` if the store fails.
    pub async fn list_my_orders(&self, caller: &Caller) -> Result<Vec<Order>, ServiceError> {
        Ok(self.store.orders_for_user(caller.user_id).await?)
    }

    /// Every order, for the admin dashboard.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthorized` unless the caller is an admin.
    pub async fn list_all_orders(&self, caller: &Caller) -> Result<Vec<Order>, ServiceError> {
        require_admin(caller, "list all orders")?;
        Ok(self.store.all_orders().await?)
    }

    /// Orders still awaiting delivery, for the delivery dashboard.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthorized` unless the caller is an admin or
    /// delivery partner.
    pub async fn list_delivery_orders(&self, caller: &Caller) -> Result<Vec<Order>, ServiceError> {
        if !caller.has_any_role(Role::ORDER_STATUS_EDITORS) {
            return Err(ServiceError::Unauthorized(
                "only delivery partners can view the delivery queue".to_owned(),
            ));
        }
        let open: Vec<OrderStatus> = OrderStatus::ALL
            .iter()
            .copied()
            .filter(OrderStatus::is_open_for_delivery)
            .collect();
        Ok(self.store.orders_with_status(&open).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use dryfruit_core::{OrderNumber, Price, UserId, VariantId};

    use super::*;
    use crate::models::product::fixtures::product;
    use crate::services::cart::CartService;
    use crate::store::memory::MemoryStore;

    fn shopper(id: i32) -> Caller {
        Caller::new(UserId::new(id), Role::User)
    }

    fn admin() -> Caller {
        Caller::new(UserId::new(1), Role::Admin)
    }

    fn shipping() -> ShippingInfo {
        ShippingInfo {
            name: "Asha Rao".to_owned(),
            email: "asha@example.com".to_owned(),
            phone: "9876543210".to_owned(),
            pincode: "560001".to_owned(),
            address: "12 MG Road".to_owned(),
            city: "Bengaluru".to_owned(),
            location: None,
            notes: None,
        }
    }

    /// Variant A (101) costs 500, variant B (201) costs 300.
    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_product(product(1, "Kaju Katli", &[("500g", 500, 10)]));
        store.insert_product(product(2, "Anjeer", &[("250g", 300, 10)]));
        store
    }

    async fn fill_cart(store: &MemoryStore, caller: &Caller) {
        let cart = CartService::new(store);
        cart.add_to_cart(caller, ProductId::new(1), VariantId::new(101), 2)
            .await
            .unwrap();
        cart.add_to_cart(caller, ProductId::new(2), VariantId::new(201), 1)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_order_prices_and_clears_cart() {
        let store = store();
        let caller = shopper(7);
        fill_cart(&store, &caller).await;

        let order = OrderService::new(&store)
            .create_order(&caller, &shipping(), PaymentMethod::Cod)
            .await
            .unwrap();

        assert_eq!(order.items.len(), 2);
        assert_eq!(order.pricing.items_price, Price::from_rupees(1300));
        assert_eq!(order.pricing.shipping_price, Price::ZERO);
        assert_eq!(order.pricing.total_price, Price::from_rupees(1300));
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.order_number, OrderNumber::new(1001));
        assert_eq!(order.payment_info.status, PaymentStatus::Pending);
        assert!(order.delivered_at.is_none());
        assert!(store.cart(caller.user_id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_order_uses_live_prices() {
        let store = store();
        let caller = shopper(7);
        fill_cart(&store, &caller).await;
        store.edit_product(ProductId::new(1), |p| {
            p.variants[0].price = Price::from_rupees(550);
            p.name = "Kaju Katli Special".to_owned();
        });

        let order = OrderService::new(&store)
            .create_order(&caller, &shipping(), PaymentMethod::Card)
            .await
            .unwrap();

        assert_eq!(order.items[0].price, Price::from_rupees(550));
        assert_eq!(order.items[0].name, "Kaju Katli Special");
        assert_eq!(order.pricing.items_price, Price::from_rupees(1400));
    }

    #[tokio::test]
    async fn test_placed_order_is_frozen() {
        let store = store();
        let caller = shopper(7);
        fill_cart(&store, &caller).await;
        let service = OrderService::new(&store);
        let order = service
            .create_order(&caller, &shipping(), PaymentMethod::Cod)
            .await
            .unwrap();

        store.edit_product(ProductId::new(1), |p| {
            p.variants[0].price = Price::from_rupees(999);
        });

        let stored = service.get_order(&caller, order.id).await.unwrap();
        assert_eq!(stored.items[0].item.price, Price::from_rupees(500));
        assert_eq!(stored.pricing.total_price, Price::from_rupees(1300));
    }

    #[tokio::test]
    async fn test_order_detail_shows_live_variants() {
        let store = store();
        let caller = shopper(7);
        fill_cart(&store, &caller).await;
        let service = OrderService::new(&store);
        let order = service
            .create_order(&caller, &shipping(), PaymentMethod::Cod)
            .await
            .unwrap();

        store.edit_product(ProductId::new(1), |p| {
            p.variants[0].price = Price::from_rupees(650);
        });
        store.edit_product(ProductId::new(2), |p| p.variants.clear());

        let detail = service.get_order(&caller, order.id).await.unwrap();
        let katli = &detail.items[0];
        assert_eq!(katli.item.price, Price::from_rupees(500));
        assert_eq!(
            katli.variant_details.as_ref().unwrap().price,
            Price::from_rupees(650)
        );
        assert!(detail.items[1].variant_details.is_none());

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["items"][0]["variantId"], 101);
        assert_eq!(json["items"][0]["variantDetails"]["weight"], "500g");
        assert!(json["items"][1]["variantDetails"].is_null());
    }

    #[tokio::test]
    async fn test_mark_delivered_is_admin_only() {
        let store = store();
        let caller = shopper(7);
        fill_cart(&store, &caller).await;
        let service = OrderService::new(&store);
        let order = service
            .create_order(&caller, &shipping(), PaymentMethod::Cod)
            .await
            .unwrap();

        let courier = Caller::new(UserId::new(3), Role::Delivery);
        assert!(matches!(
            service.mark_delivered(&courier, order.id).await,
            Err(ServiceError::Unauthorized(_))
        ));

        let delivered = service.mark_delivered(&admin(), order.id).await.unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);
        assert!(delivered.delivered_at.is_some());
        assert!(matches!(
            service.mark_delivered(&admin(), OrderId::new(404)).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_or_missing_cart_is_empty_cart() {
        let store = store();
        let service = OrderService::new(&store);
        let caller = shopper(7);

        let err = service
            .create_order(&caller, &shipping(), PaymentMethod::Cod)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::EmptyCart));

        fill_cart(&store, &caller).await;
        CartService::new(&store).clear_cart(&caller).await.unwrap();
        let err = service
            .create_order(&caller, &shipping(), PaymentMethod::Cod)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::EmptyCart));
        assert_eq!(store.order_count(), 0);
    }

    #[tokio::test]
    async fn test_deleted_variant_fails_order_and_keeps_cart() {
        let store = store();
        let caller = shopper(7);
        fill_cart(&store, &caller).await;
        store.edit_product(ProductId::new(2), |p| p.variants.clear());

        let err = OrderService::new(&store)
            .create_order(&caller, &shipping(), PaymentMethod::Cod)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::NotFound(_)));
        assert_eq!(store.cart(caller.user_id).unwrap().items.len(), 2);
        assert_eq!(store.order_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_insert_keeps_cart_and_counter() {
        let store = store();
        let caller = shopper(7);
        fill_cart(&store, &caller).await;
        let before = store.cart(caller.user_id).unwrap();
        store.fail_order_insert(true);

        let err = OrderService::new(&store)
            .create_order(&caller, &shipping(), PaymentMethod::Cod)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Persistence(_)));
        assert_eq!(store.cart(caller.user_id).unwrap(), before);
        assert_eq!(store.order_count(), 0);

        store.fail_order_insert(false);
        let order = OrderService::new(&store)
            .create_order(&caller, &shipping(), PaymentMethod::Cod)
            .await
            .unwrap();
        assert_eq!(order.order_number, OrderNumber::new(1001));
    }

    #[tokio::test]
    async fn test_invalid_shipping_is_rejected_before_reading_cart() {
        let store = store();
        let caller = shopper(7);
        fill_cart(&store, &caller).await;
        let mut info = shipping();
        info.address = String::new();

        let err = OrderService::new(&store)
            .create_order(&caller, &info, PaymentMethod::Cod)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::InvalidArgument(_)));
        assert_eq!(store.cart(caller.user_id).unwrap().items.len(), 2);
    }

    #[tokio::test]
    async fn test_activity_failure_does_not_fail_order() {
        let store = store();
        let caller = shopper(7);
        fill_cart(&store, &caller).await;
        store.fail_activity(true);

        let order = OrderService::new(&store)
            .create_order(&caller, &shipping(), PaymentMethod::Cod)
            .await;

        assert!(order.is_ok());
        assert!(store.activities().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_orders_get_distinct_numbers() {
        let store = Arc::new(store());
        for id in [7, 8] {
            fill_cart(&store, &shopper(id)).await;
        }

        let handles: Vec<_> = [7, 8]
            .into_iter()
            .map(|id| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    OrderService::new(&*store)
                        .create_order(&shopper(id), &shipping(), PaymentMethod::Cod)
                        .await
                        .unwrap()
                        .order_number
                })
            })
            .collect();

        let mut numbers = Vec::new();
        for handle in handles {
            numbers.push(handle.await.unwrap());
        }
        numbers.sort();

        assert_eq!(numbers, vec![OrderNumber::new(1001), OrderNumber::new(1002)]);
    }

    #[tokio::test]
    async fn test_status_lifecycle_stamps_delivery() {
        let store = store();
        let caller = shopper(7);
        fill_cart(&store, &caller).await;
        let service = OrderService::new(&store);
        let order = service
            .create_order(&caller, &shipping(), PaymentMethod::Cod)
            .await
            .unwrap();

        let shipped = service
            .update_status(&admin(), order.id, "shipped")
            .await
            .unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);
        assert!(shipped.delivered_at.is_none());

        let courier = Caller::new(UserId::new(3), Role::Delivery);
        let delivered = service
            .update_status(&courier, order.id, "delivered")
            .await
            .unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);
        assert!(delivered.delivered_at.unwrap() >= delivered.created_at);

        let kinds: Vec<ActivityKind> = store.activities().iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ActivityKind::OrderPlaced,
                ActivityKind::OrderShipped,
                ActivityKind::OrderDelivered
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_status_leaves_order_unchanged() {
        let store = store();
        let caller = shopper(7);
        fill_cart(&store, &caller).await;
        let service = OrderService::new(&store);
        let order = service
            .create_order(&caller, &shipping(), PaymentMethod::Cod)
            .await
            .unwrap();

        let err = service
            .update_status(&admin(), order.id, "lost")
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::InvalidArgument(_)));
        let stored = service.get_order(&caller, order.id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Processing);
    }

    #[tokio::test]
    async fn test_shopper_cannot_change_status() {
        let store = store();
        let caller = shopper(7);
        fill_cart(&store, &caller).await;
        let service = OrderService::new(&store);
        let order = service
            .create_order(&caller, &shipping(), PaymentMethod::Cod)
            .await
            .unwrap();

        let err = service
            .update_status(&caller, order.id, "delivered")
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Unauthorized(_)));
        let stored = service.get_order(&caller, order.id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Processing);
        assert!(stored.delivered_at.is_none());
    }

    #[tokio::test]
    async fn test_cancel_after_delivery_is_accepted() {
        let store = store();
        let caller = shopper(7);
        fill_cart(&store, &caller).await;
        let service = OrderService::new(&store);
        let order = service
            .create_order(&caller, &shipping(), PaymentMethod::Cod)
            .await
            .unwrap();
        service
            .update_status(&admin(), order.id, "delivered")
            .await
            .unwrap();

        let cancelled = service
            .update_status(&admin(), order.id, "cancelled")
            .await
            .unwrap();

        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(cancelled.delivered_at.is_some());
    }

    #[tokio::test]
    async fn test_status_update_for_missing_order() {
        let store = store();
        let err = OrderService::new(&store)
            .update_status(&admin(), OrderId::new(404), "shipped")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_order_visibility() {
        let store = store();
        let owner = shopper(7);
        fill_cart(&store, &owner).await;
        let service = OrderService::new(&store);
        let order = service
            .create_order(&owner, &shipping(), PaymentMethod::Cod)
            .await
            .unwrap();

        assert!(service.get_order(&admin(), order.id).await.is_ok());
        assert!(matches!(
            service.get_order(&shopper(8), order.id).await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert_eq!(service.list_my_orders(&owner).await.unwrap().len(), 1);
        assert!(service.list_my_orders(&shopper(8)).await.unwrap().is_empty());
        assert!(service.list_all_orders(&owner).await.is_err());
        assert_eq!(service.list_all_orders(&admin()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delivery_queue_excludes_closed_orders() {
        let store = store();
        let service = OrderService::new(&store);
        let mut ids = Vec::new();
        for id in [7, 8, 9] {
            let caller = shopper(id);
            fill_cart(&store, &caller).await;
            let order = service
                .create_order(&caller, &shipping(), PaymentMethod::Cod)
                .await
                .unwrap();
            ids.push(order.id);
        }
        service
            .update_status(&admin(), ids[0], "delivered")
            .await
            .unwrap();
        service
            .update_status(&admin(), ids[1], "shipped")
            .await
            .unwrap();

        let courier = Caller::new(UserId::new(3), Role::Delivery);
        let queue = service.list_delivery_orders(&courier).await.unwrap();

        let queued: Vec<OrderId> = queue.iter().map(|o| o.id).collect();
        assert_eq!(queued, vec![ids[2], ids[1]]);
        assert!(service.list_delivery_orders(&shopper(7)).await.is_err());
    }
}
