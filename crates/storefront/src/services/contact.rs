//! Contact-form inbox.

use tracing::instrument;

use dryfruit_core::{ContactId, ContactStatus};

use super::{ServiceError, require_admin};
use crate::db::contacts::ContactRepository;
use crate::models::{Caller, ContactForm, ContactSubmission};

/// Contact-form operations.
pub struct ContactService<'a> {
    contacts: ContactRepository<'a>,
}

impl<'a> ContactService<'a> {
    #[must_use]
    pub const fn new(pool: &'a sqlx::PgPool) -> Self {
        Self {
            contacts: ContactRepository::new(pool),
        }
    }

    /// Store a public submission.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidArgument` if the form is incomplete.
    #[instrument(skip(self, form))]
    pub async fn submit(&self, form: ContactForm) -> Result<ContactSubmission, ServiceError> {
        let contact = form.validate().map_err(ServiceError::InvalidArgument)?;
        let submission = self.contacts.create(&contact).await?;
        tracing::info!(contact_id = %submission.id, "Contact form submitted");
        Ok(submission)
    }

    /// All submissions, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthorized` unless the caller is an admin.
    pub async fn list(&self, caller: &Caller) -> Result<Vec<ContactSubmission>, ServiceError> {
        require_admin(caller, "read contact messages")?;
        Ok(self.contacts.list_all().await?)
    }

    /// Mark a submission read or responded.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthorized` unless the caller is an admin.
    /// Returns `ServiceError::InvalidArgument` for an unknown status.
    /// Returns `ServiceError::NotFound` if the submission doesn't exist.
    pub async fn update_status(
        &self,
        caller: &Caller,
        id: ContactId,
        status: &str,
    ) -> Result<ContactSubmission, ServiceError> {
        require_admin(caller, "update contact messages")?;
        let status: ContactStatus = status.parse().map_err(
            |e: dryfruit_core::ParseEnumError| ServiceError::InvalidArgument(e.to_string()),
        )?;

        self.contacts
            .set_status(id, status)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("contact {id}")))
    }
}
