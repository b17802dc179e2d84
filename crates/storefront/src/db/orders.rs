//! Order repository for database operations.
//!
//! Placing an order is the one multi-table write in the storefront: issuing
//! the order number, inserting the order and its lines, and clearing the
//! cart all commit together or not at all.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use dryfruit_core::{
    OrderId, OrderNumber, OrderStatus, PaymentMethod, PaymentStatus, Price, ProductId, UserId,
    VariantId,
};

use super::{RepositoryError, carts, counters, quantity_from_db, quantity_to_db};
use crate::models::order::{
    NewOrder, ORDER_NUMBER_COUNTER, ORDER_NUMBER_START, Order, OrderCustomer, OrderItem,
    OrderPricing, PaymentInfo, ShippingInfo,
};
use crate::models::product::ProductImage;

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    order_number: i64,
    user_id: i32,
    shipping_info: Json<ShippingInfo>,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    items_price: Price,
    shipping_price: Price,
    total_price: Price,
    status: OrderStatus,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    customer_first_name: Option<String>,
    customer_last_name: Option<String>,
    customer_email: Option<String>,
    customer_phone: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    order_id: i32,
    product_id: i32,
    variant_id: i32,
    name: String,
    quantity: i32,
    price: Price,
    weight: String,
    images: Json<Vec<ProductImage>>,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            product_id: ProductId::new(row.product_id),
            variant_id: VariantId::new(row.variant_id),
            name: row.name,
            quantity: quantity_from_db(row.quantity)?,
            price: row.price,
            weight: row.weight,
            images: row.images.0,
        })
    }
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        let customer = match (
            self.customer_first_name,
            self.customer_last_name,
            self.customer_email,
        ) {
            (Some(first_name), Some(last_name), Some(email)) => Some(OrderCustomer {
                first_name,
                last_name,
                email,
                phone: self.customer_phone,
            }),
            _ => None,
        };

        Order {
            id: OrderId::new(self.id),
            order_number: OrderNumber::new(self.order_number),
            user_id: UserId::new(self.user_id),
            customer,
            items,
            shipping_info: self.shipping_info.0,
            payment_info: PaymentInfo {
                method: self.payment_method,
                status: self.payment_status,
            },
            pricing: OrderPricing {
                items_price: self.items_price,
                shipping_price: self.shipping_price,
                total_price: self.total_price,
            },
            status: self.status,
            delivered_at: self.delivered_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const ORDER_SELECT: &str = r#"
    SELECT o.id, o.order_number, o.user_id, o.shipping_info, o.payment_method,
           o.payment_status, o.items_price, o.shipping_price, o.total_price, o.status,
           o.delivered_at, o.created_at, o.updated_at,
           u.first_name AS customer_first_name, u.last_name AS customer_last_name,
           u.email AS customer_email, u.phone AS customer_phone
    FROM storefront."order" o
    LEFT JOIN storefront.user u ON u.id = o.user_id
"#;

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Attach line items to order rows, preserving row order.
    async fn with_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();

        let item_rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT order_id, product_id, variant_id, name, quantity, price, weight, images
            FROM storefront.order_item
            WHERE order_id = ANY($1)
            ORDER BY order_id, position
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut items_by_order: HashMap<i32, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            let order_id = row.order_id;
            items_by_order
                .entry(order_id)
                .or_default()
                .push(row.try_into()?);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let items = items_by_order.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect())
    }

    /// Persist a new order, issuing its number and clearing the user's cart.
    ///
    /// Everything runs in one transaction: on any error nothing is written,
    /// the counter does not advance, and the cart keeps its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails.
    /// Returns `RepositoryError::DataCorruption` if a quantity is out of range.
    pub async fn place(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let order_number =
            counters::increment_and_get(&mut *tx, ORDER_NUMBER_COUNTER, ORDER_NUMBER_START)
                .await?;

        let (id, created_at, updated_at): (i32, DateTime<Utc>, DateTime<Utc>) =
            sqlx::query_as(
                r#"
                INSERT INTO storefront."order" (
                    order_number, user_id, shipping_info, payment_method, payment_status,
                    items_price, shipping_price, total_price, status
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING id, created_at, updated_at
                "#,
            )
            .bind(order_number)
            .bind(order.user_id)
            .bind(Json(&order.shipping_info))
            .bind(order.payment_info.method)
            .bind(order.payment_info.status)
            .bind(order.pricing.items_price)
            .bind(order.pricing.shipping_price)
            .bind(order.pricing.total_price)
            .bind(OrderStatus::Processing)
            .fetch_one(&mut *tx)
            .await?;

        for (position, item) in (0_i32..).zip(&order.items) {
            sqlx::query(
                r"
                INSERT INTO storefront.order_item
                    (order_id, position, product_id, variant_id, name, quantity, price, weight, images)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ",
            )
            .bind(id)
            .bind(position)
            .bind(item.product_id)
            .bind(item.variant_id)
            .bind(&item.name)
            .bind(quantity_to_db(item.quantity)?)
            .bind(item.price)
            .bind(&item.weight)
            .bind(Json(&item.images))
            .execute(&mut *tx)
            .await?;
        }

        carts::clear_items(&mut *tx, order.user_id).await?;

        tx.commit().await?;

        Ok(Order {
            id: OrderId::new(id),
            order_number: OrderNumber::new(order_number),
            user_id: order.user_id,
            customer: None,
            items: order.items.clone(),
            shipping_info: order.shipping_info.clone(),
            payment_info: order.payment_info,
            pricing: order.pricing,
            status: OrderStatus::Processing,
            delivered_at: None,
            created_at,
            updated_at,
        })
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("{ORDER_SELECT} WHERE o.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(self.with_items(row.into_iter().collect()).await?.pop())
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_SELECT} WHERE o.user_id = $1 ORDER BY o.created_at DESC, o.id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        self.with_items(rows).await
    }

    /// Every order, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_SELECT} ORDER BY o.created_at DESC, o.id DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        self.with_items(rows).await
    }

    /// Orders currently in any of `statuses`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_with_status(
        &self,
        statuses: &[OrderStatus],
    ) -> Result<Vec<Order>, RepositoryError> {
        let wire: Vec<&str> = statuses.iter().map(OrderStatus::as_str).collect();
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_SELECT} WHERE o.status::text = ANY($1) ORDER BY o.created_at DESC, o.id DESC"
        ))
        .bind(&wire)
        .fetch_all(self.pool)
        .await?;

        self.with_items(rows).await
    }

    /// Set an order's status, stamping `delivered_at` when one is given.
    ///
    /// A `None` timestamp leaves any earlier delivery stamp in place.
    /// Returns `None` if the order doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        delivered_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Order>, RepositoryError> {
        let updated = sqlx::query(
            r#"
            UPDATE storefront."order"
            SET status = $2,
                delivered_at = COALESCE($3, delivered_at),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(delivered_at)
        .execute(self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_by_id(id).await
    }
}
