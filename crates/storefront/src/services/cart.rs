//! Cart line resolution.
//!
//! Keeps each user's cart consistent with the catalog: a line can only be
//! created for a variant that resolves at that moment, and lines for the same
//! (product, variant) pair are merged. Every mutation loads the whole cart,
//! changes it in memory, and writes it back.

use std::collections::HashMap;

use tracing::instrument;

use dryfruit_core::{CartItemId, ProductId, VariantId};

use super::ServiceError;
use crate::models::cart::MAX_LINE_QUANTITY;
use crate::models::{Caller, Cart, CartLineView, CartView, Product};
use crate::store::{CartStore, CatalogStore};

/// Check that a requested quantity is a usable line quantity.
///
/// # Errors
///
/// Returns `ServiceError::InvalidArgument` for quantities below 1 or above
/// [`MAX_LINE_QUANTITY`].
pub fn line_quantity(quantity: i64) -> Result<u32, ServiceError> {
    if quantity < 1 {
        return Err(ServiceError::InvalidArgument(
            "quantity must be at least 1".to_owned(),
        ));
    }
    u32::try_from(quantity)
        .ok()
        .filter(|q| *q <= MAX_LINE_QUANTITY)
        .ok_or_else(|| ServiceError::InvalidArgument("quantity is too large".to_owned()))
}

/// Cart operations for the calling user.
pub struct CartService<'a, S> {
    store: &'a S,
}

impl<'a, S> CartService<'a, S>
where
    S: CatalogStore + CartStore,
{
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// The caller's cart, or an unsaved empty one.
    async fn load(&self, caller: &Caller) -> Result<Cart, ServiceError> {
        Ok(self
            .store
            .find_cart(caller.user_id)
            .await?
            .unwrap_or_else(|| Cart::empty(caller.user_id)))
    }

    /// Resolve every line against the live catalog.
    ///
    /// Products are fetched once each; a line whose product or variant is
    /// gone falls back to its snapshot.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Persistence` if a product lookup fails.
    pub async fn view(&self, cart: &Cart) -> Result<CartView, ServiceError> {
        let mut products: HashMap<ProductId, Option<Product>> = HashMap::new();
        for item in &cart.items {
            if !products.contains_key(&item.product_id) {
                let product = self.store.find_product(item.product_id).await?;
                products.insert(item.product_id, product);
            }
        }

        let lines = cart
            .items
            .iter()
            .map(|item| {
                let product = products.get(&item.product_id).and_then(Option::as_ref);
                CartLineView::resolve(item, product)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CartView::from_lines(lines)?)
    }

    /// The caller's cart with live variant details.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Persistence` if the store fails.
    #[instrument(skip(self), fields(user_id = %caller.user_id))]
    pub async fn get_cart(&self, caller: &Caller) -> Result<CartView, ServiceError> {
        let cart = self.load(caller).await?;
        self.view(&cart).await
    }

    /// Add `quantity` units of a variant, merging onto an existing line.
    ///
    /// The new line snapshots the variant's current price and weight.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidArgument` if the quantity is not positive.
    /// Returns `ServiceError::NotFound` if the product or variant doesn't
    /// resolve; the cart is not touched.
    #[instrument(skip(self), fields(user_id = %caller.user_id))]
    pub async fn add_to_cart(
        &self,
        caller: &Caller,
        product_id: ProductId,
        variant_id: VariantId,
        quantity: i64,
    ) -> Result<CartView, ServiceError> {
        let quantity = line_quantity(quantity)?;

        let product = self
            .store
            .find_product(product_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("product {product_id}")))?;
        let variant = product
            .variant(variant_id)
            .ok_or_else(|| ServiceError::not_found(format!("variant {variant_id}")))?;

        let mut cart = self.load(caller).await?;
        if !cart.add(product_id, variant, quantity) {
            return Err(ServiceError::InvalidArgument(
                "quantity is too large".to_owned(),
            ));
        }
        self.store.save_cart(&cart).await?;

        self.view(&cart).await
    }

    /// Overwrite the quantity of one line.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidArgument` if the quantity is below 1,
    /// before anything is read.
    /// Returns `ServiceError::NotFound` if the caller has no cart or the line
    /// isn't in it.
    #[instrument(skip(self), fields(user_id = %caller.user_id))]
    pub async fn update_line_quantity(
        &self,
        caller: &Caller,
        item_id: CartItemId,
        quantity: i64,
    ) -> Result<CartView, ServiceError> {
        let quantity = line_quantity(quantity)?;

        let mut cart = self
            .store
            .find_cart(caller.user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("cart"))?;
        if !cart.set_quantity(item_id, quantity) {
            return Err(ServiceError::not_found(format!("cart item {item_id}")));
        }
        self.store.save_cart(&cart).await?;

        self.view(&cart).await
    }

    /// Remove one line. Removing a line that isn't there is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Persistence` if the store fails.
    #[instrument(skip(self), fields(user_id = %caller.user_id))]
    pub async fn remove_line(
        &self,
        caller: &Caller,
        item_id: CartItemId,
    ) -> Result<CartView, ServiceError> {
        let mut cart = self.load(caller).await?;
        if cart.remove(item_id) {
            self.store.save_cart(&cart).await?;
        }

        self.view(&cart).await
    }

    /// Remove every line. Clearing an empty or missing cart succeeds.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Persistence` if the store fails.
    #[instrument(skip(self), fields(user_id = %caller.user_id))]
    pub async fn clear_cart(&self, caller: &Caller) -> Result<CartView, ServiceError> {
        let Some(mut cart) = self.store.find_cart(caller.user_id).await? else {
            return self.view(&Cart::empty(caller.user_id)).await;
        };
        if !cart.is_empty() {
            cart.clear();
            self.store.save_cart(&cart).await?;
        }

        self.view(&cart).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use dryfruit_core::{Price, Role, UserId};

    use super::*;
    use crate::models::product::fixtures::product;
    use crate::store::memory::MemoryStore;

    fn shopper() -> Caller {
        Caller::new(UserId::new(7), Role::User)
    }

    fn store_with_catalog() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_product(product(1, "Cashews", &[("500g", 500, 10), ("1kg", 950, 5)]));
        store.insert_product(product(2, "Dates", &[("250g", 300, 10)]));
        store
    }

    #[test]
    fn test_line_quantity_bounds() {
        assert_eq!(line_quantity(1).unwrap(), 1);
        assert!(matches!(
            line_quantity(0),
            Err(ServiceError::InvalidArgument(_))
        ));
        assert!(line_quantity(-3).is_err());
        assert!(line_quantity(i64::from(MAX_LINE_QUANTITY) + 1).is_err());
    }

    #[tokio::test]
    async fn test_add_unknown_variant_leaves_cart_unchanged() {
        let store = store_with_catalog();
        let service = CartService::new(&store);
        let caller = shopper();
        service
            .add_to_cart(&caller, ProductId::new(1), VariantId::new(101), 1)
            .await
            .unwrap();
        let before = store.cart(caller.user_id).unwrap();

        let err = service
            .add_to_cart(&caller, ProductId::new(1), VariantId::new(999), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let err = service
            .add_to_cart(&caller, ProductId::new(42), VariantId::new(101), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        assert_eq!(store.cart(caller.user_id).unwrap(), before);
    }

    #[tokio::test]
    async fn test_add_unknown_product_creates_no_cart() {
        let store = store_with_catalog();
        let service = CartService::new(&store);

        let result = service
            .add_to_cart(&shopper(), ProductId::new(9), VariantId::new(901), 1)
            .await;

        assert!(result.is_err());
        assert!(store.cart(shopper().user_id).is_none());
    }

    #[tokio::test]
    async fn test_repeated_add_merges_quantities() {
        let store = store_with_catalog();
        let service = CartService::new(&store);
        let caller = shopper();

        service
            .add_to_cart(&caller, ProductId::new(1), VariantId::new(102), 2)
            .await
            .unwrap();
        let view = service
            .add_to_cart(&caller, ProductId::new(1), VariantId::new(102), 3)
            .await
            .unwrap();

        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].quantity, 5);
        assert_eq!(view.item_count, 5);
        assert_eq!(view.subtotal, Price::from_rupees(4750));
    }

    #[tokio::test]
    async fn test_add_rejects_non_positive_quantity() {
        let store = store_with_catalog();
        let service = CartService::new(&store);

        let err = service
            .add_to_cart(&shopper(), ProductId::new(1), VariantId::new(101), 0)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::InvalidArgument(_)));
        assert!(store.cart(shopper().user_id).is_none());
    }

    #[tokio::test]
    async fn test_update_line_quantity() {
        let store = store_with_catalog();
        let service = CartService::new(&store);
        let caller = shopper();
        let view = service
            .add_to_cart(&caller, ProductId::new(2), VariantId::new(201), 1)
            .await
            .unwrap();
        let line = view.items[0].id;

        let view = service
            .update_line_quantity(&caller, line, 4)
            .await
            .unwrap();
        assert_eq!(view.items[0].quantity, 4);

        let err = service
            .update_line_quantity(&caller, line, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
        assert_eq!(store.cart(caller.user_id).unwrap().items[0].quantity, 4);

        let err = service
            .update_line_quantity(&caller, CartItemId::generate(), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_without_cart_is_not_found() {
        let store = store_with_catalog();
        let service = CartService::new(&store);

        let err = service
            .update_line_quantity(&shopper(), CartItemId::generate(), 2)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_remove_line_is_idempotent() {
        let store = store_with_catalog();
        let service = CartService::new(&store);
        let caller = shopper();
        let view = service
            .add_to_cart(&caller, ProductId::new(2), VariantId::new(201), 1)
            .await
            .unwrap();
        let line = view.items[0].id;

        let first = service.remove_line(&caller, line).await.unwrap();
        let second = service.remove_line(&caller, line).await.unwrap();

        assert!(first.items.is_empty());
        assert!(second.items.is_empty());
    }

    #[tokio::test]
    async fn test_clear_cart_twice_succeeds() {
        let store = store_with_catalog();
        let service = CartService::new(&store);
        let caller = shopper();
        service
            .add_to_cart(&caller, ProductId::new(1), VariantId::new(101), 2)
            .await
            .unwrap();

        let first = service.clear_cart(&caller).await.unwrap();
        let second = service.clear_cart(&caller).await.unwrap();

        assert!(first.items.is_empty());
        assert!(second.items.is_empty());
        assert_eq!(second.subtotal, Price::ZERO);
        assert!(store.cart(caller.user_id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_missing_cart_succeeds() {
        let store = store_with_catalog();
        let service = CartService::new(&store);

        let view = service.clear_cart(&shopper()).await.unwrap();

        assert!(view.items.is_empty());
        assert!(store.cart(shopper().user_id).is_none());
    }

    #[tokio::test]
    async fn test_view_shows_live_price_and_cached_fallback() {
        let store = store_with_catalog();
        let service = CartService::new(&store);
        let caller = shopper();
        service
            .add_to_cart(&caller, ProductId::new(1), VariantId::new(101), 1)
            .await
            .unwrap();
        service
            .add_to_cart(&caller, ProductId::new(2), VariantId::new(201), 2)
            .await
            .unwrap();

        store.edit_product(ProductId::new(1), |p| {
            p.variants[0].price = Price::from_rupees(520);
        });
        store.edit_product(ProductId::new(2), |p| p.variants.clear());

        let view = service.get_cart(&caller).await.unwrap();
        assert_eq!(view.items[0].price, Price::from_rupees(520));
        assert_eq!(view.items[1].price, Price::from_rupees(300));
        assert!(view.items[1].variant_details.is_none());
        assert_eq!(view.subtotal, Price::from_rupees(1120));
    }

    #[tokio::test]
    async fn test_save_failure_propagates() {
        let store = store_with_catalog();
        let service = CartService::new(&store);
        store.fail_cart_save(true);

        let err = service
            .add_to_cart(&shopper(), ProductId::new(1), VariantId::new(101), 1)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Persistence(_)));
    }
}
