//! Contact-form inbox repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use dryfruit_core::{ContactId, ContactStatus};

use super::RepositoryError;
use crate::models::contact::{ContactSubmission, NewContact};

#[derive(Debug, sqlx::FromRow)]
struct ContactRow {
    id: i32,
    name: String,
    email: String,
    phone: Option<String>,
    message: String,
    status: ContactStatus,
    created_at: DateTime<Utc>,
}

impl From<ContactRow> for ContactSubmission {
    fn from(row: ContactRow) -> Self {
        Self {
            id: ContactId::new(row.id),
            name: row.name,
            email: row.email,
            phone: row.phone,
            message: row.message,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

/// Repository for contact submissions.
pub struct ContactRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContactRepository<'a> {
    /// Create a new contact repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a submission with status `new`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, contact: &NewContact) -> Result<ContactSubmission, RepositoryError> {
        let row = sqlx::query_as::<_, ContactRow>(
            r"
            INSERT INTO storefront.contact (name, email, phone, message)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, phone, message, status, created_at
            ",
        )
        .bind(&contact.name)
        .bind(&contact.email)
        .bind(contact.phone.as_deref())
        .bind(&contact.message)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// All submissions, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<ContactSubmission>, RepositoryError> {
        let rows = sqlx::query_as::<_, ContactRow>(
            r"
            SELECT id, name, email, phone, message, status, created_at
            FROM storefront.contact
            ORDER BY created_at DESC, id DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Change a submission's triage status.
    ///
    /// Returns `None` if the submission doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_status(
        &self,
        id: ContactId,
        status: ContactStatus,
    ) -> Result<Option<ContactSubmission>, RepositoryError> {
        let row = sqlx::query_as::<_, ContactRow>(
            r"
            UPDATE storefront.contact SET status = $2
            WHERE id = $1
            RETURNING id, name, email, phone, message, status, created_at
            ",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}
