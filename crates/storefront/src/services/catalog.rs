//! Product listing and admin catalog management.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use dryfruit_core::{ActivityKind, ImageId, Price, ProductCategory, ProductId};

use super::{ServiceError, activity, require_admin};
use crate::db::PgStore;
use crate::db::products::ProductRepository;
use crate::models::product::{
    DEFAULT_LOW_STOCK_THRESHOLD, DEFAULT_RATING, DEFAULT_VARIANT_STOCK, DEFAULT_VARIANT_WEIGHT,
};
use crate::models::{
    Caller, NewActivity, NewProduct, NewProductImage, Product, ProductFilter, ProductImage,
    ProductPage, ProductPatch, ProductSort, SortField, VariantInput,
};

/// Default page size.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page a client may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Listing query string, parsed leniently for paging and strictly for filters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub category: Option<String>,
    pub featured: Option<String>,
    pub active: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl ProductQuery {
    /// Build a validated filter.
    ///
    /// Shoppers only ever see active products; admins see everything unless
    /// they ask for a specific `active` value.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidArgument` for an unknown category or
    /// sort field, or a malformed boolean or price.
    pub fn into_filter(self, caller: Option<&Caller>) -> Result<ProductFilter, ServiceError> {
        let is_admin = caller.is_some_and(Caller::is_admin);
        let active = parse_opt(self.active.as_deref(), parse_bool)?;

        let min_price = parse_opt(self.min_price.as_deref(), parse_price)?;
        let max_price = parse_opt(self.max_price.as_deref(), parse_price)?;
        if let (Some(min), Some(max)) = (min_price, max_price)
            && min > max
        {
            return Err(ServiceError::InvalidArgument(
                "minPrice must not exceed maxPrice".to_owned(),
            ));
        }

        Ok(ProductFilter {
            category: parse_opt(self.category.as_deref(), |s| {
                ProductCategory::from_str(s)
                    .map_err(|e| ServiceError::InvalidArgument(e.to_string()))
            })?,
            featured: parse_opt(self.featured.as_deref(), parse_bool)?,
            active: if is_admin { active } else { Some(true) },
            min_price,
            max_price,
            search: self
                .search
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty()),
            sort: parse_opt(self.sort.as_deref(), parse_sort)?.unwrap_or_default(),
            page: self
                .page
                .and_then(|p| p.trim().parse::<u32>().ok())
                .filter(|&p| p >= 1)
                .unwrap_or(1),
            limit: self
                .limit
                .and_then(|l| l.trim().parse::<u32>().ok())
                .map_or(DEFAULT_PAGE_SIZE, |l| l.clamp(1, MAX_PAGE_SIZE)),
        })
    }
}

fn parse_opt<T>(
    value: Option<&str>,
    parse: impl FnOnce(&str) -> Result<T, ServiceError>,
) -> Result<Option<T>, ServiceError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse(v).map(Some),
    }
}

fn parse_bool(value: &str) -> Result<bool, ServiceError> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(ServiceError::InvalidArgument(format!(
            "expected true or false, got {other:?}"
        ))),
    }
}

fn parse_price(value: &str) -> Result<Price, ServiceError> {
    let amount = Decimal::from_str(value)
        .map_err(|_| ServiceError::InvalidArgument(format!("invalid price {value:?}")))?;
    Ok(Price::new(amount)?)
}

/// `name`, `-price`, `createdAt`, ...
fn parse_sort(value: &str) -> Result<ProductSort, ServiceError> {
    let (descending, field) = value
        .strip_prefix('-')
        .map_or((false, value), |rest| (true, rest));
    let field = match field {
        "createdAt" | "created_at" => SortField::CreatedAt,
        "name" => SortField::Name,
        "rating" => SortField::Rating,
        "price" => SortField::Price,
        other => {
            return Err(ServiceError::InvalidArgument(format!(
                "cannot sort by {other:?}"
            )));
        }
    };
    Ok(ProductSort { field, descending })
}

/// Lower-case `name` and join whitespace-separated words with `-`.
#[must_use]
pub fn slugify(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Admin product form.
///
/// Either `variants` or a top-level `price` is required; with only `price`
/// a single variant is built from `price`, `weight`, and `stock`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub short_description: String,
    pub category: ProductCategory,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub allergens: Vec<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub low_stock_threshold: Option<i32>,
    #[serde(default)]
    pub shelf_life: String,
    #[serde(default)]
    pub storage_instructions: String,
    #[serde(default)]
    pub preparation_time: String,
    #[serde(default)]
    pub is_vegan: bool,
    #[serde(default)]
    pub is_gluten_free: bool,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub variants: Option<Vec<VariantInput>>,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default)]
    pub weight: Option<String>,
    #[serde(default)]
    pub stock: Option<i32>,
}

impl ProductInput {
    /// Validate and fill in defaults.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidArgument` describing the first problem.
    pub fn into_new_product(self) -> Result<NewProduct, ServiceError> {
        let name = self.name.trim().to_owned();
        if name.is_empty() {
            return Err(ServiceError::InvalidArgument("name is required".to_owned()));
        }
        let slug = slugify(self.slug.as_deref().unwrap_or(&name));
        if slug.is_empty() {
            return Err(ServiceError::InvalidArgument("slug is required".to_owned()));
        }
        let rating = self.rating.unwrap_or(DEFAULT_RATING);
        check_rating(rating)?;
        let low_stock_threshold = self.low_stock_threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
        if low_stock_threshold < 0 {
            return Err(ServiceError::InvalidArgument(
                "lowStockThreshold must not be negative".to_owned(),
            ));
        }

        let variants = match (self.variants, self.price) {
            (Some(variants), _) if !variants.is_empty() => variants,
            (_, Some(price)) => vec![VariantInput {
                id: None,
                weight: self
                    .weight
                    .unwrap_or_else(|| DEFAULT_VARIANT_WEIGHT.to_owned()),
                price,
                original_price: None,
                stock: self.stock.unwrap_or(DEFAULT_VARIANT_STOCK),
                is_active: true,
            }],
            _ => {
                return Err(ServiceError::InvalidArgument(
                    "a price or at least one variant is required".to_owned(),
                ));
            }
        };
        check_variants(&variants)?;

        Ok(NewProduct {
            slug,
            name,
            description: self.description,
            short_description: self.short_description,
            category: self.category,
            ingredients: self.ingredients,
            tags: self.tags,
            allergens: self.allergens,
            rating,
            low_stock_threshold,
            shelf_life: self.shelf_life,
            storage_instructions: self.storage_instructions,
            preparation_time: self.preparation_time,
            is_vegan: self.is_vegan,
            is_gluten_free: self.is_gluten_free,
            is_active: self.is_active.unwrap_or(true),
            featured: self.featured,
            variants,
        })
    }
}

fn check_rating(rating: f64) -> Result<(), ServiceError> {
    if (1.0..=5.0).contains(&rating) {
        Ok(())
    } else {
        Err(ServiceError::InvalidArgument(
            "rating must be between 1 and 5".to_owned(),
        ))
    }
}

fn check_variants(variants: &[VariantInput]) -> Result<(), ServiceError> {
    for variant in variants {
        if variant.weight.trim().is_empty() {
            return Err(ServiceError::InvalidArgument(
                "variant weight is required".to_owned(),
            ));
        }
        if variant.stock < 0 {
            return Err(ServiceError::InvalidArgument(
                "stock must not be negative".to_owned(),
            ));
        }
    }
    Ok(())
}

fn check_patch(patch: &mut ProductPatch) -> Result<(), ServiceError> {
    if let Some(name) = &mut patch.name {
        *name = name.trim().to_owned();
        if name.is_empty() {
            return Err(ServiceError::InvalidArgument("name must not be empty".to_owned()));
        }
    }
    if let Some(slug) = &mut patch.slug {
        *slug = slugify(slug);
        if slug.is_empty() {
            return Err(ServiceError::InvalidArgument("slug must not be empty".to_owned()));
        }
    }
    if let Some(rating) = patch.rating {
        check_rating(rating)?;
    }
    if let Some(variants) = &patch.variants {
        if variants.is_empty() {
            return Err(ServiceError::InvalidArgument(
                "a product needs at least one variant".to_owned(),
            ));
        }
        check_variants(variants)?;
    }
    Ok(())
}

/// Catalog reads and admin writes.
pub struct CatalogService<'a> {
    store: &'a PgStore,
    products: ProductRepository<'a>,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub fn new(store: &'a PgStore) -> Self {
        Self {
            store,
            products: ProductRepository::new(store.pool()),
        }
    }

    /// One page of products.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidArgument` if the query doesn't parse.
    #[instrument(skip(self, query, caller))]
    pub async fn list_products(
        &self,
        caller: Option<&Caller>,
        query: ProductQuery,
    ) -> Result<ProductPage, ServiceError> {
        let filter = query.into_filter(caller)?;
        let data = self.products.list(&filter).await?;
        let total = self.products.count(&filter).await?;

        Ok(ProductPage {
            count: data.len(),
            total,
            page: filter.page,
            limit: filter.limit,
            data,
        })
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product doesn't exist.
    pub async fn get_product(&self, id: ProductId) -> Result<Product, ServiceError> {
        self.products
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("product {id}")))
    }

    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if no product has this slug.
    pub async fn get_product_by_slug(&self, slug: &str) -> Result<Product, ServiceError> {
        self.products
            .get_by_slug(slug)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("product {slug:?}")))
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthorized` unless the caller is an admin.
    /// Returns `ServiceError::InvalidArgument` if the form is invalid.
    /// Returns `ServiceError::Conflict` if the slug is taken.
    #[instrument(skip(self, input), fields(admin_id = %caller.user_id))]
    pub async fn create_product(
        &self,
        caller: &Caller,
        input: ProductInput,
    ) -> Result<Product, ServiceError> {
        require_admin(caller, "create products")?;
        let product = self.products.create(&input.into_new_product()?).await?;

        tracing::info!(product_id = %product.id, slug = %product.slug, "Product created");
        self.log(caller, ActivityKind::ProductAdd, &product, "added").await;
        Ok(product)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthorized` unless the caller is an admin.
    /// Returns `ServiceError::NotFound` if the product doesn't exist.
    /// Returns `ServiceError::Conflict` if the new slug is taken.
    #[instrument(skip(self, patch), fields(admin_id = %caller.user_id))]
    pub async fn update_product(
        &self,
        caller: &Caller,
        id: ProductId,
        mut patch: ProductPatch,
    ) -> Result<Product, ServiceError> {
        require_admin(caller, "update products")?;
        check_patch(&mut patch)?;

        let product = self
            .products
            .update(id, &patch)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("product {id}")))?;

        self.log(caller, ActivityKind::ProductUpdate, &product, "updated")
            .await;
        Ok(product)
    }

    /// Delete a product with its variants and images.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthorized` unless the caller is an admin.
    /// Returns `ServiceError::NotFound` if the product doesn't exist.
    #[instrument(skip(self), fields(admin_id = %caller.user_id))]
    pub async fn delete_product(&self, caller: &Caller, id: ProductId) -> Result<(), ServiceError> {
        require_admin(caller, "delete products")?;
        let product = self.get_product(id).await?;
        if !self.products.delete(id).await? {
            return Err(ServiceError::not_found(format!("product {id}")));
        }

        self.log(caller, ActivityKind::ProductDelete, &product, "deleted")
            .await;
        Ok(())
    }

    /// Attach uploaded image metadata.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthorized` unless the caller is an admin.
    /// Returns `ServiceError::InvalidArgument` if no images or blank URLs are given.
    /// Returns `ServiceError::NotFound` if the product doesn't exist.
    #[instrument(skip(self, images), fields(admin_id = %caller.user_id, count = images.len()))]
    pub async fn add_product_images(
        &self,
        caller: &Caller,
        id: ProductId,
        images: Vec<NewProductImage>,
    ) -> Result<Product, ServiceError> {
        require_admin(caller, "upload product images")?;
        if images.is_empty() {
            return Err(ServiceError::InvalidArgument("no images given".to_owned()));
        }
        if images.iter().any(|i| i.url.trim().is_empty()) {
            return Err(ServiceError::InvalidArgument("image url is required".to_owned()));
        }

        let product = self
            .products
            .add_images(id, &images)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("product {id}")))?;

        self.log(caller, ActivityKind::ProductImagesAdd, &product, "given new images")
            .await;
        Ok(product)
    }

    /// Detach one image. The upload itself is removed by the object store's owner.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthorized` unless the caller is an admin.
    /// Returns `ServiceError::NotFound` if the product or image doesn't exist.
    #[instrument(skip(self), fields(admin_id = %caller.user_id))]
    pub async fn delete_product_image(
        &self,
        caller: &Caller,
        product_id: ProductId,
        image_id: ImageId,
    ) -> Result<ProductImage, ServiceError> {
        require_admin(caller, "delete product images")?;
        let product = self.get_product(product_id).await?;
        let image = self
            .products
            .delete_image(product_id, image_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("image {image_id}")))?;

        self.log(caller, ActivityKind::ProductImageDelete, &product, "lost an image")
            .await;
        Ok(image)
    }

    async fn log(&self, caller: &Caller, kind: ActivityKind, product: &Product, verb: &str) {
        activity::record(
            self.store,
            NewActivity::new(kind, caller.user_id, format!("Product {} {verb}", product.name))
                .with_metadata(json!({ "productId": product.id, "name": product.name })),
        )
        .await;
    }
}
