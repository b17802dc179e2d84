//! Cart repository for database operations.
//!
//! A cart is read and written as a whole: `save` replaces every line in one
//! transaction, so a reader never sees a half-written cart.

use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};

use dryfruit_core::{CartItemId, Price, ProductId, UserId, VariantId};

use super::{RepositoryError, quantity_from_db, quantity_to_db};
use crate::models::cart::{Cart, CartItem};

#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    id: CartItemId,
    product_id: i32,
    variant_id: i32,
    quantity: i32,
    price: Price,
    weight: String,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RepositoryError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            product_id: ProductId::new(row.product_id),
            variant_id: VariantId::new(row.variant_id),
            quantity: quantity_from_db(row.quantity)?,
            price: row.price,
            weight: row.weight,
        })
    }
}

/// Delete every line of `user_id`'s cart.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn clear_items<'e, E>(executor: E, user_id: UserId) -> Result<(), RepositoryError>
where
    E: PgExecutor<'e>,
{
    sqlx::query("DELETE FROM storefront.cart_item WHERE user_id = $1")
        .bind(user_id)
        .execute(executor)
        .await?;

    Ok(())
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load a user's cart with its lines in insertion order.
    ///
    /// Returns `None` if the user never had a cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored quantity is invalid.
    pub async fn find_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let updated_at: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT updated_at FROM storefront.cart WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(self.pool)
                .await?;

        let Some(updated_at) = updated_at else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, CartItemRow>(
            r"
            SELECT id, product_id, variant_id, quantity, price, weight
            FROM storefront.cart_item
            WHERE user_id = $1
            ORDER BY position
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Cart {
            user_id,
            items,
            updated_at: Some(updated_at),
        }))
    }

    /// Persist the cart, replacing all of its stored lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a quantity is out of range.
    pub async fn save(&self, cart: &Cart) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO storefront.cart (user_id) VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET updated_at = now()
            ",
        )
        .bind(cart.user_id)
        .execute(&mut *tx)
        .await?;

        clear_items(&mut *tx, cart.user_id).await?;

        for (position, item) in (0_i32..).zip(&cart.items) {
            sqlx::query(
                r"
                INSERT INTO storefront.cart_item
                    (id, user_id, position, product_id, variant_id, quantity, price, weight)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ",
            )
            .bind(item.id)
            .bind(cart.user_id)
            .bind(position)
            .bind(item.product_id)
            .bind(item.variant_id)
            .bind(quantity_to_db(item.quantity)?)
            .bind(item.price)
            .bind(&item.weight)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
