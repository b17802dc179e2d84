//! Product repository for database operations.
//!
//! A product is stored across three tables (`product`, `product_variant`,
//! `product_image`); reads assemble the full aggregate.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use dryfruit_core::{ImageId, Price, ProductCategory, ProductId, VariantId};

use super::RepositoryError;
use crate::models::product::{
    NewProduct, NewProductImage, Product, ProductFilter, ProductImage, ProductPatch, SortField,
    Variant, VariantInput,
};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    slug: String,
    name: String,
    description: String,
    short_description: String,
    category: ProductCategory,
    ingredients: Vec<String>,
    tags: Vec<String>,
    allergens: Vec<String>,
    rating: f64,
    num_reviews: i32,
    low_stock_threshold: i32,
    shelf_life: String,
    storage_instructions: String,
    preparation_time: String,
    is_vegan: bool,
    is_gluten_free: bool,
    is_active: bool,
    featured: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct VariantRow {
    id: i32,
    product_id: i32,
    weight: String,
    price: Price,
    original_price: Option<Price>,
    stock: i32,
    is_active: bool,
}

impl From<VariantRow> for Variant {
    fn from(row: VariantRow) -> Self {
        Self {
            id: VariantId::new(row.id),
            weight: row.weight,
            price: row.price,
            original_price: row.original_price,
            stock: row.stock,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ImageRow {
    id: i32,
    product_id: i32,
    url: String,
    alt: String,
    is_primary: bool,
    public_id: Option<String>,
}

impl From<ImageRow> for ProductImage {
    fn from(row: ImageRow) -> Self {
        Self {
            id: ImageId::new(row.id),
            url: row.url,
            alt: row.alt,
            is_primary: row.is_primary,
            public_id: row.public_id,
        }
    }
}

/// Join product rows with their children, preserving the row order.
fn assemble(
    rows: Vec<ProductRow>,
    variants: Vec<VariantRow>,
    images: Vec<ImageRow>,
) -> Vec<Product> {
    let mut variants_by_product: HashMap<i32, Vec<Variant>> = HashMap::new();
    for v in variants {
        variants_by_product
            .entry(v.product_id)
            .or_default()
            .push(v.into());
    }
    let mut images_by_product: HashMap<i32, Vec<ProductImage>> = HashMap::new();
    for i in images {
        images_by_product
            .entry(i.product_id)
            .or_default()
            .push(i.into());
    }

    rows.into_iter()
        .map(|r| Product {
            id: ProductId::new(r.id),
            slug: r.slug,
            name: r.name,
            description: r.description,
            short_description: r.short_description,
            category: r.category,
            ingredients: r.ingredients,
            tags: r.tags,
            allergens: r.allergens,
            rating: r.rating,
            num_reviews: r.num_reviews,
            low_stock_threshold: r.low_stock_threshold,
            shelf_life: r.shelf_life,
            storage_instructions: r.storage_instructions,
            preparation_time: r.preparation_time,
            is_vegan: r.is_vegan,
            is_gluten_free: r.is_gluten_free,
            is_active: r.is_active,
            featured: r.featured,
            images: images_by_product.remove(&r.id).unwrap_or_default(),
            variants: variants_by_product.remove(&r.id).unwrap_or_default(),
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
        .collect()
}

const PRODUCT_COLUMNS: &str = "p.id, p.slug, p.name, p.description, p.short_description, \
     p.category, p.ingredients, p.tags, p.allergens, p.rating, p.num_reviews, \
     p.low_stock_threshold, p.shelf_life, p.storage_instructions, p.preparation_time, \
     p.is_vegan, p.is_gluten_free, p.is_active, p.featured, p.created_at, p.updated_at";

/// Shared WHERE clause for listing and counting. Parameters:
/// `$1` category, `$2` featured, `$3` active, `$4` min price, `$5` max price,
/// `$6` ILIKE pattern.
const FILTER_CLAUSE: &str = r"
    WHERE ($1::storefront.product_category IS NULL OR p.category = $1)
      AND ($2::boolean IS NULL OR p.featured = $2)
      AND ($3::boolean IS NULL OR p.is_active = $3)
      AND (($4::numeric IS NULL AND $5::numeric IS NULL) OR EXISTS (
            SELECT 1 FROM storefront.product_variant v
            WHERE v.product_id = p.id
              AND ($4::numeric IS NULL OR v.price >= $4)
              AND ($5::numeric IS NULL OR v.price <= $5)))
      AND ($6::text IS NULL
           OR p.name ILIKE $6
           OR p.description ILIKE $6
           OR EXISTS (SELECT 1 FROM unnest(p.tags) AS t(tag) WHERE t.tag ILIKE $6))
";

/// ORDER BY expression for a whitelisted sort.
const fn order_clause(field: SortField, descending: bool) -> &'static str {
    match (field, descending) {
        (SortField::CreatedAt, false) => "p.created_at ASC, p.id ASC",
        (SortField::CreatedAt, true) => "p.created_at DESC, p.id DESC",
        (SortField::Name, false) => "p.name ASC, p.id ASC",
        (SortField::Name, true) => "p.name DESC, p.id DESC",
        (SortField::Rating, false) => "p.rating ASC, p.id ASC",
        (SortField::Rating, true) => "p.rating DESC, p.id DESC",
        (SortField::Price, false) => {
            "(SELECT min(v.price) FROM storefront.product_variant v WHERE v.product_id = p.id) \
             ASC NULLS LAST, p.id ASC"
        }
        (SortField::Price, true) => {
            "(SELECT min(v.price) FROM storefront.product_variant v WHERE v.product_id = p.id) \
             DESC NULLS LAST, p.id DESC"
        }
    }
}

/// Wrap a search term for ILIKE, escaping wildcards.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load variants and images for the given rows.
    async fn hydrate(&self, rows: Vec<ProductRow>) -> Result<Vec<Product>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();

        let variants = sqlx::query_as::<_, VariantRow>(
            r"
            SELECT id, product_id, weight, price, original_price, stock, is_active
            FROM storefront.product_variant
            WHERE product_id = ANY($1)
            ORDER BY product_id, position, id
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let images = sqlx::query_as::<_, ImageRow>(
            r"
            SELECT id, product_id, url, alt, is_primary, public_id
            FROM storefront.product_image
            WHERE product_id = ANY($1)
            ORDER BY product_id, id
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        Ok(assemble(rows, variants, images))
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product p WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(self.hydrate(row.into_iter().collect()).await?.pop())
    }

    /// Get a product by its URL slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product p WHERE p.slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(self.hydrate(row.into_iter().collect()).await?.pop())
    }

    /// Get several products at once, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let raw: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product p WHERE p.id = ANY($1)"
        ))
        .bind(&raw)
        .fetch_all(self.pool)
        .await?;

        self.hydrate(rows).await
    }

    /// List one page of products matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product p {FILTER_CLAUSE} \
             ORDER BY {} LIMIT $7 OFFSET $8",
            order_clause(filter.sort.field, filter.sort.descending)
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(filter.category)
            .bind(filter.featured)
            .bind(filter.active)
            .bind(filter.min_price)
            .bind(filter.max_price)
            .bind(filter.search.as_deref().map(like_pattern))
            .bind(i64::from(filter.limit))
            .bind(filter.offset())
            .fetch_all(self.pool)
            .await?;

        self.hydrate(rows).await
    }

    /// Count all products matching `filter`, ignoring pagination.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, filter: &ProductFilter) -> Result<i64, RepositoryError> {
        let sql = format!("SELECT count(*) FROM storefront.product p {FILTER_CLAUSE}");
        let total: i64 = sqlx::query_scalar(&sql)
            .bind(filter.category)
            .bind(filter.featured)
            .bind(filter.active)
            .bind(filter.min_price)
            .bind(filter.max_price)
            .bind(filter.search.as_deref().map(like_pattern))
            .fetch_one(self.pool)
            .await?;

        Ok(total)
    }

    /// Insert a product and its variants.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO storefront.product (
                slug, name, description, short_description, category, ingredients, tags,
                allergens, rating, low_stock_threshold, shelf_life, storage_instructions,
                preparation_time, is_vegan, is_gluten_free, is_active, featured
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING id
            ",
        )
        .bind(&product.slug)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.short_description)
        .bind(product.category)
        .bind(&product.ingredients)
        .bind(&product.tags)
        .bind(&product.allergens)
        .bind(product.rating)
        .bind(product.low_stock_threshold)
        .bind(&product.shelf_life)
        .bind(&product.storage_instructions)
        .bind(&product.preparation_time)
        .bind(product.is_vegan)
        .bind(product.is_gluten_free)
        .bind(product.is_active)
        .bind(product.featured)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "slug"))?;

        for (position, variant) in (0_i32..).zip(&product.variants) {
            insert_variant(&mut tx, id, position, variant).await?;
        }

        tx.commit().await?;

        self.get_by_id(ProductId::new(id))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Apply a partial update.
    ///
    /// Returns `None` if the product doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the new slug is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r"
            UPDATE storefront.product SET
                slug = COALESCE($2, slug),
                name = COALESCE($3, name),
                description = COALESCE($4, description),
                short_description = COALESCE($5, short_description),
                category = COALESCE($6, category),
                ingredients = COALESCE($7, ingredients),
                tags = COALESCE($8, tags),
                allergens = COALESCE($9, allergens),
                rating = COALESCE($10, rating),
                low_stock_threshold = COALESCE($11, low_stock_threshold),
                shelf_life = COALESCE($12, shelf_life),
                storage_instructions = COALESCE($13, storage_instructions),
                preparation_time = COALESCE($14, preparation_time),
                is_vegan = COALESCE($15, is_vegan),
                is_gluten_free = COALESCE($16, is_gluten_free),
                is_active = COALESCE($17, is_active),
                featured = COALESCE($18, featured),
                updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(patch.slug.as_deref())
        .bind(patch.name.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.short_description.as_deref())
        .bind(patch.category)
        .bind(patch.ingredients.as_deref())
        .bind(patch.tags.as_deref())
        .bind(patch.allergens.as_deref())
        .bind(patch.rating)
        .bind(patch.low_stock_threshold)
        .bind(patch.shelf_life.as_deref())
        .bind(patch.storage_instructions.as_deref())
        .bind(patch.preparation_time.as_deref())
        .bind(patch.is_vegan)
        .bind(patch.is_gluten_free)
        .bind(patch.is_active)
        .bind(patch.featured)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "slug"))?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        if let Some(variants) = &patch.variants {
            replace_variants(&mut tx, id.as_i32(), variants).await?;
        }

        tx.commit().await?;

        self.get_by_id(id).await
    }

    /// Delete a product and its variants and images.
    ///
    /// Returns `true` if the product existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.product WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Attach image metadata to a product.
    ///
    /// Returns `None` if the product doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add_images(
        &self,
        id: ProductId,
        images: &[NewProductImage],
    ) -> Result<Option<Product>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<i32> =
            sqlx::query_scalar("SELECT id FROM storefront.product WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Ok(None);
        }

        // A new primary image demotes the current one
        if images.iter().any(|i| i.is_primary) {
            sqlx::query(
                "UPDATE storefront.product_image SET is_primary = false WHERE product_id = $1",
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        for image in images {
            sqlx::query(
                r"
                INSERT INTO storefront.product_image (product_id, url, alt, is_primary, public_id)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(id)
            .bind(&image.url)
            .bind(&image.alt)
            .bind(image.is_primary)
            .bind(image.public_id.as_deref())
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE storefront.product SET updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.get_by_id(id).await
    }

    /// Remove one image from a product.
    ///
    /// Returns the removed image, or `None` if it wasn't attached to the product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_image(
        &self,
        product_id: ProductId,
        image_id: ImageId,
    ) -> Result<Option<ProductImage>, RepositoryError> {
        let row = sqlx::query_as::<_, ImageRow>(
            r"
            DELETE FROM storefront.product_image
            WHERE id = $1 AND product_id = $2
            RETURNING id, product_id, url, alt, is_primary, public_id
            ",
        )
        .bind(image_id)
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}

async fn insert_variant(
    conn: &mut PgConnection,
    product_id: i32,
    position: i32,
    variant: &VariantInput,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO storefront.product_variant
            (product_id, position, weight, price, original_price, stock, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ",
    )
    .bind(product_id)
    .bind(position)
    .bind(&variant.weight)
    .bind(variant.price)
    .bind(variant.original_price)
    .bind(variant.stock)
    .bind(variant.is_active)
    .execute(conn)
    .await?;

    Ok(())
}

/// Make the product's variants match `variants`, keeping ids where given.
async fn replace_variants(
    conn: &mut PgConnection,
    product_id: i32,
    variants: &[VariantInput],
) -> Result<(), RepositoryError> {
    let kept: Vec<i32> = variants
        .iter()
        .filter_map(|v| v.id.map(|id| id.as_i32()))
        .collect();

    sqlx::query(
        "DELETE FROM storefront.product_variant WHERE product_id = $1 AND NOT (id = ANY($2))",
    )
    .bind(product_id)
    .bind(&kept)
    .execute(&mut *conn)
    .await?;

    for (position, variant) in (0_i32..).zip(variants) {
        let updated = match variant.id {
            Some(variant_id) => sqlx::query(
                r"
                UPDATE storefront.product_variant
                SET position = $3, weight = $4, price = $5, original_price = $6,
                    stock = $7, is_active = $8
                WHERE id = $1 AND product_id = $2
                ",
            )
            .bind(variant_id)
            .bind(product_id)
            .bind(position)
            .bind(&variant.weight)
            .bind(variant.price)
            .bind(variant.original_price)
            .bind(variant.stock)
            .bind(variant.is_active)
            .execute(&mut *conn)
            .await?
            .rows_affected(),
            None => 0,
        };

        // Unknown or missing ids become new variants
        if updated == 0 {
            insert_variant(conn, product_id, position, variant).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn row(id: i32, name: &str) -> ProductRow {
        let now = Utc::now();
        ProductRow {
            id,
            slug: name.to_lowercase(),
            name: name.to_owned(),
            description: String::new(),
            short_description: String::new(),
            category: ProductCategory::Regular,
            ingredients: vec![],
            tags: vec![],
            allergens: vec![],
            rating: 4.5,
            num_reviews: 0,
            low_stock_threshold: 10,
            shelf_life: String::new(),
            storage_instructions: String::new(),
            preparation_time: String::new(),
            is_vegan: false,
            is_gluten_free: false,
            is_active: true,
            featured: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn variant(id: i32, product_id: i32) -> VariantRow {
        VariantRow {
            id,
            product_id,
            weight: "250g".to_owned(),
            price: Price::from_rupees(250),
            original_price: None,
            stock: 4,
            is_active: true,
        }
    }

    #[test]
    fn test_assemble_groups_children_by_product() {
        let products = assemble(
            vec![row(2, "Walnuts"), row(1, "Raisins")],
            vec![variant(10, 1), variant(20, 2), variant(21, 2)],
            vec![ImageRow {
                id: 5,
                product_id: 2,
                url: "https://img.example.com/w.jpg".to_owned(),
                alt: String::new(),
                is_primary: true,
                public_id: Some("walnuts/1".to_owned()),
            }],
        );

        assert_eq!(products.len(), 2);
        assert_eq!(products[0].name, "Walnuts");
        assert_eq!(products[0].variants.len(), 2);
        assert_eq!(products[0].images.len(), 1);
        assert_eq!(products[1].variants[0].id, VariantId::new(10));
        assert!(products[1].images.is_empty());
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("kaju"), "%kaju%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_order_clause_is_whitelisted() {
        assert_eq!(
            order_clause(SortField::Name, false),
            "p.name ASC, p.id ASC"
        );
        assert!(order_clause(SortField::Price, true).starts_with("(SELECT min(v.price)"));
    }
}
