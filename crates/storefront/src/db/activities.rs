//! Activity log repository. Entries are append-only.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use dryfruit_core::{ActivityId, ActivityKind, UserId};

use super::RepositoryError;
use crate::models::activity::{Activity, ActivityUser, NewActivity};

#[derive(Debug, sqlx::FromRow)]
struct ActivityRow {
    id: i32,
    kind: ActivityKind,
    user_id: Option<i32>,
    description: String,
    metadata: Json<serde_json::Value>,
    created_at: DateTime<Utc>,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
}

impl From<ActivityRow> for Activity {
    fn from(row: ActivityRow) -> Self {
        let user = match (row.first_name, row.last_name, row.email) {
            (Some(first_name), Some(last_name), Some(email)) => Some(ActivityUser {
                first_name,
                last_name,
                email,
            }),
            _ => None,
        };

        Self {
            id: ActivityId::new(row.id),
            kind: row.kind,
            user_id: row.user_id.map(UserId::new),
            user,
            description: row.description,
            metadata: row.metadata.0,
            created_at: row.created_at,
        }
    }
}

/// Repository for the activity log.
pub struct ActivityRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ActivityRepository<'a> {
    /// Create a new activity repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Append an entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn record(&self, activity: &NewActivity) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.activity (type, user_id, description, metadata)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(activity.kind)
        .bind(activity.user_id)
        .bind(&activity.description)
        .bind(Json(&activity.metadata))
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// The most recent `limit` entries with their users, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest(&self, limit: i64) -> Result<Vec<Activity>, RepositoryError> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            r"
            SELECT a.id, a.type AS kind, a.user_id, a.description, a.metadata, a.created_at,
                   u.first_name, u.last_name, u.email
            FROM storefront.activity a
            LEFT JOIN storefront.user u ON u.id = a.user_id
            ORDER BY a.created_at DESC, a.id DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
