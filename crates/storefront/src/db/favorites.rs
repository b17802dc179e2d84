//! Favorites repository.

use sqlx::PgPool;

use dryfruit_core::{ProductId, UserId};

use super::RepositoryError;

/// Repository for a user's favorite products.
pub struct FavoriteRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> FavoriteRepository<'a> {
    /// Create a new favorites repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Favorite product IDs, most recently added first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<ProductId>, RepositoryError> {
        let ids: Vec<i32> = sqlx::query_scalar(
            r"
            SELECT product_id FROM storefront.favorite
            WHERE user_id = $1
            ORDER BY created_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(ids.into_iter().map(ProductId::new).collect())
    }

    /// Add the product if absent, remove it if present.
    ///
    /// Returns `true` if the product is now a favorite.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn toggle(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query(
            "DELETE FROM storefront.favorite WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(&mut *tx)
        .await?;

        let added = if removed.rows_affected() == 0 {
            sqlx::query(
                r"
                INSERT INTO storefront.favorite (user_id, product_id) VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                ",
            )
            .bind(user_id)
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
            true
        } else {
            false
        };

        tx.commit().await?;
        Ok(added)
    }
}
