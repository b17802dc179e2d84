//! Failures raised while registering, logging in, or managing an account.
//!
//! Route handlers never show these directly; [`crate::error::AppError`] maps
//! each one onto a status code and a shopper-facing message.

use thiserror::Error;

use crate::db::RepositoryError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] dryfruit_core::EmailError),

    /// Unknown email and wrong password look the same to the client.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("user not found")]
    UserNotFound,

    /// The email is already registered.
    #[error("an account with this email already exists")]
    UserAlreadyExists,

    /// Rejected by the password length rules.
    #[error("weak password: {0}")]
    WeakPassword(String),

    /// A registration field was blank; the payload is the message to show.
    #[error("{0}")]
    MissingField(String),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Argon2 failed to hash or parse a stored hash.
    #[error("password hashing failed")]
    PasswordHash,
}
