//! Shopping cart aggregate.
//!
//! A cart is a per-user list of lines. Each line snapshots the variant's price
//! and weight at the moment it was added; that snapshot is a display cache
//! only; order creation always re-reads the live variant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dryfruit_core::{CartItemId, Price, PriceError, ProductId, UserId, VariantId};

use super::product::{Product, ProductSummary, Variant};

/// Largest quantity a single line can hold.
///
/// Line totals are further bounded by [`Price::MAX`], so an oversized order
/// fails validation instead of overflowing the order columns.
pub const MAX_LINE_QUANTITY: u32 = 1_000;

/// One (product, variant, quantity) entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: u32,
    /// Variant price when the line was created.
    pub price: Price,
    /// Variant weight when the line was created.
    pub weight: String,
}

/// A user's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub user_id: UserId,
    pub items: Vec<CartItem>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Cart {
    /// A cart with no lines that has never been persisted.
    #[must_use]
    pub const fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            items: Vec::new(),
            updated_at: None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add `quantity` units of `variant`, merging onto an existing line.
    ///
    /// Returns `false` if the merged quantity would exceed
    /// [`MAX_LINE_QUANTITY`]; the cart is unchanged in that case.
    #[must_use]
    pub fn add(&mut self, product_id: ProductId, variant: &Variant, quantity: u32) -> bool {
        if let Some(line) = self
            .items
            .iter_mut()
            .find(|i| i.product_id == product_id && i.variant_id == variant.id)
        {
            return match line
                .quantity
                .checked_add(quantity)
                .filter(|q| *q <= MAX_LINE_QUANTITY)
            {
                Some(merged) => {
                    line.quantity = merged;
                    true
                }
                None => false,
            };
        }

        if quantity > MAX_LINE_QUANTITY {
            return false;
        }
        self.items.push(CartItem {
            id: CartItemId::generate(),
            product_id,
            variant_id: variant.id,
            quantity,
            price: variant.price,
            weight: variant.weight.clone(),
        });
        true
    }

    /// Overwrite a line's quantity. Returns `false` if the line is absent.
    pub fn set_quantity(&mut self, id: CartItemId, quantity: u32) -> bool {
        match self.items.iter_mut().find(|i| i.id == id) {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Remove a line. Returns `false` if the line was not in the cart.
    pub fn remove(&mut self, id: CartItemId) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.id != id);
        self.items.len() != before
    }

    /// Drop every line, keeping the cart itself.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

// =============================================================================
// Read model
// =============================================================================

/// A cart line enriched with live catalog data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: u32,
    /// Live variant price, or the snapshot if the variant is gone.
    pub price: Price,
    /// Live variant weight, or the snapshot if the variant is gone.
    pub weight: String,
    pub line_total: Price,
    pub product: Option<ProductSummary>,
    pub variant_details: Option<Variant>,
}

/// The cart as shown to the shopper.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub item_count: u64,
    pub subtotal: Price,
}

impl CartLineView {
    /// Build the view of `item`, preferring live data from `product`.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if the line total is not representable.
    pub fn resolve(item: &CartItem, product: Option<&Product>) -> Result<Self, PriceError> {
        let variant = product.and_then(|p| p.variant(item.variant_id)).cloned();
        let (price, weight) = variant.as_ref().map_or_else(
            || (item.price, item.weight.clone()),
            |v| (v.price, v.weight.clone()),
        );
        Ok(Self {
            id: item.id,
            product_id: item.product_id,
            variant_id: item.variant_id,
            quantity: item.quantity,
            price,
            weight,
            line_total: price.times(item.quantity)?,
            product: product.map(Product::summary),
            variant_details: variant,
        })
    }
}

impl CartView {
    /// Assemble a view from resolved lines.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if the subtotal is not representable.
    pub fn from_lines(items: Vec<CartLineView>) -> Result<Self, PriceError> {
        let subtotal = items
            .iter()
            .try_fold(Price::ZERO, |acc, line| acc.checked_add(line.line_total))?;
        let item_count = items.iter().map(|i| u64::from(i.quantity)).sum();
        Ok(Self {
            items,
            item_count,
            subtotal,
        })
    }
}
