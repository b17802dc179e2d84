//! Service-layer error taxonomy.

use thiserror::Error;

use dryfruit_core::PriceError;

use crate::db::RepositoryError;

/// Errors returned by storefront service operations.
///
/// Every variant except `Persistence` is raised before any state is
/// mutated, so the caller can report it without worrying about partial
/// effects.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A referenced product, variant, cart, cart line, or order doesn't exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Input failed validation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Order creation against a cart with no lines.
    #[error("cart is empty")]
    EmptyCart,

    /// The caller's role doesn't permit the operation.
    #[error("not allowed: {0}")]
    Unauthorized(String),

    /// A uniqueness constraint would be violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The store failed.
    #[error("persistence failure: {0}")]
    Persistence(#[source] RepositoryError),
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(what) => Self::Conflict(what),
            other => Self::Persistence(other),
        }
    }
}

impl From<PriceError> for ServiceError {
    fn from(err: PriceError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

impl ServiceError {
    pub(crate) fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound(what.to_string())
    }
}
