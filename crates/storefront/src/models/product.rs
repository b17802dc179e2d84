//! Catalog domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dryfruit_core::{ImageId, Price, ProductCategory, ProductId, VariantId};

/// Default product rating for new listings.
pub const DEFAULT_RATING: f64 = 4.5;

/// Default low-stock alert threshold.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 10;

/// Weight label used when a product is created without explicit variants.
pub const DEFAULT_VARIANT_WEIGHT: &str = "1kg";

/// Stock used when a product is created without explicit variants.
pub const DEFAULT_VARIANT_STOCK: i32 = 10;

/// A purchasable SKU within a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: VariantId,
    /// Display weight, e.g. "250g" or "1kg".
    pub weight: String,
    pub price: Price,
    /// List price shown struck through, if discounted.
    pub original_price: Option<Price>,
    pub stock: i32,
    pub is_active: bool,
}

/// Image metadata. The binary lives in an external object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductImage {
    pub id: ImageId,
    pub url: String,
    pub alt: String,
    pub is_primary: bool,
    /// Key at the object store, used to delete the upload.
    pub public_id: Option<String>,
}

/// A catalog product with its variants and images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub short_description: String,
    pub category: ProductCategory,
    pub ingredients: Vec<String>,
    pub tags: Vec<String>,
    pub allergens: Vec<String>,
    pub rating: f64,
    pub num_reviews: i32,
    pub low_stock_threshold: i32,
    pub shelf_life: String,
    pub storage_instructions: String,
    pub preparation_time: String,
    pub is_vegan: bool,
    pub is_gluten_free: bool,
    pub is_active: bool,
    pub featured: bool,
    pub images: Vec<ProductImage>,
    pub variants: Vec<Variant>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Look up one of this product's variants.
    #[must_use]
    pub fn variant(&self, id: VariantId) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == id)
    }

    /// Cheapest variant price, used for price filtering and sorting.
    #[must_use]
    pub fn min_price(&self) -> Option<Price> {
        self.variants.iter().map(|v| v.price).min()
    }

    /// Total units in stock across variants.
    #[must_use]
    pub fn total_stock(&self) -> i64 {
        self.variants.iter().map(|v| i64::from(v.stock)).sum()
    }

    /// Whether total stock has fallen to the alert threshold.
    #[must_use]
    pub fn is_low_stock(&self) -> bool {
        self.total_stock() <= i64::from(self.low_stock_threshold)
    }

    /// Lightweight summary embedded in cart and favorites responses.
    #[must_use]
    pub fn summary(&self) -> ProductSummary {
        ProductSummary {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category,
            images: self.images.clone(),
            price: self.min_price(),
        }
    }
}

/// The subset of a product shown next to a cart line or favorite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub category: ProductCategory,
    pub images: Vec<ProductImage>,
    pub price: Option<Price>,
}

// =============================================================================
// Write models
// =============================================================================

/// Variant fields supplied when creating or replacing variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantInput {
    /// Existing variant to update in place; `None` inserts a new one.
    #[serde(default)]
    pub id: Option<VariantId>,
    pub weight: String,
    pub price: Price,
    #[serde(default)]
    pub original_price: Option<Price>,
    #[serde(default = "default_variant_stock")]
    pub stock: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Fully-resolved product fields ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub slug: String,
    pub name: String,
    pub description: String,
    pub short_description: String,
    pub category: ProductCategory,
    pub ingredients: Vec<String>,
    pub tags: Vec<String>,
    pub allergens: Vec<String>,
    pub rating: f64,
    pub low_stock_threshold: i32,
    pub shelf_life: String,
    pub storage_instructions: String,
    pub preparation_time: String,
    pub is_vegan: bool,
    pub is_gluten_free: bool,
    pub is_active: bool,
    pub featured: bool,
    pub variants: Vec<VariantInput>,
}

/// Image metadata supplied after an upload to the object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProductImage {
    pub url: String,
    #[serde(default)]
    pub alt: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub public_id: Option<String>,
}

/// Partial product update. `None` leaves a field unchanged.
///
/// When `variants` is given it replaces the variant list: entries carrying an
/// `id` of an existing variant update it in place, entries without one are
/// inserted, and variants not mentioned are removed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub slug: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub category: Option<ProductCategory>,
    pub ingredients: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub allergens: Option<Vec<String>>,
    pub rating: Option<f64>,
    pub low_stock_threshold: Option<i32>,
    pub shelf_life: Option<String>,
    pub storage_instructions: Option<String>,
    pub preparation_time: Option<String>,
    pub is_vegan: Option<bool>,
    pub is_gluten_free: Option<bool>,
    pub is_active: Option<bool>,
    pub featured: Option<bool>,
    pub variants: Option<Vec<VariantInput>>,
}

// =============================================================================
// Listing
// =============================================================================

/// Column a product listing is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    Name,
    Rating,
    /// Cheapest variant price.
    Price,
}

/// Listing order; `-field` in a query string means descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductSort {
    pub field: SortField,
    pub descending: bool,
}

impl Default for ProductSort {
    /// Newest first.
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            descending: true,
        }
    }
}

/// Validated listing filters and pagination.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductFilter {
    pub category: Option<ProductCategory>,
    pub featured: Option<bool>,
    pub active: Option<bool>,
    /// Matches products with at least one variant priced within the range.
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
    /// Case-insensitive match on name, description, or any tag.
    pub search: Option<String>,
    pub sort: ProductSort,
    /// 1-based page number.
    pub page: u32,
    pub limit: u32,
}

impl ProductFilter {
    /// Rows to skip for the requested page.
    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.limit)
    }
}

/// One page of products plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    /// Number of products on this page.
    pub count: usize,
    /// Matches across all pages.
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub data: Vec<Product>,
}

const fn default_variant_stock() -> i32 {
    DEFAULT_VARIANT_STOCK
}

const fn default_true() -> bool {
    true
}
