//! Named atomic counters.
//!
//! Each counter is a single row bumped with an upsert, so concurrent callers
//! serialize on the row lock and never observe the same value.

use sqlx::{PgExecutor, PgPool};

use super::RepositoryError;

/// Increment `name` and return the new value.
///
/// A counter that doesn't exist yet is created at `start`, so its first
/// value is `start + 1`. Runs on any executor so order placement can issue
/// the number inside its own transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn increment_and_get<'e, E>(
    executor: E,
    name: &str,
    start: i64,
) -> Result<i64, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let seq = sqlx::query_scalar(
        r"
        INSERT INTO storefront.counter (name, seq)
        VALUES ($1, $2 + 1)
        ON CONFLICT (name) DO UPDATE SET seq = counter.seq + 1
        RETURNING seq
        ",
    )
    .bind(name)
    .bind(start)
    .fetch_one(executor)
    .await?;

    Ok(seq)
}

/// Repository for counter reads and standalone increments.
pub struct CounterRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CounterRepository<'a> {
    /// Create a new counter repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Increment `name` in its own statement.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn increment_and_get(&self, name: &str, start: i64) -> Result<i64, RepositoryError> {
        increment_and_get(self.pool, name, start).await
    }

    /// Current value of `name`, or `None` if it was never incremented.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn current(&self, name: &str) -> Result<Option<i64>, RepositoryError> {
        let seq = sqlx::query_scalar("SELECT seq FROM storefront.counter WHERE name = $1")
            .bind(name)
            .fetch_optional(self.pool)
            .await?;

        Ok(seq)
    }
}
