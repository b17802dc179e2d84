//! Account provisioning.
//!
//! Staff accounts can't be created through the public API, which always
//! assigns the shopper role, so admins and delivery partners are created here.

use dryfruit_core::Role;
use dryfruit_storefront::db::PgStore;
use dryfruit_storefront::services::auth::{AuthError, AuthService, Registration};
use thiserror::Error;

use super::{CommandError, connect};

#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Connection(#[from] CommandError),

    #[error("Invalid role: {0}. Valid roles: user, admin, delivery")]
    InvalidRole(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Create an account with the given role.
///
/// # Errors
///
/// Returns an error if the role is unknown, the email or password is
/// rejected, or the email is already registered.
pub async fn create_user(
    email: &str,
    first_name: &str,
    last_name: &str,
    password: &str,
    role: &str,
) -> Result<(), UserError> {
    let role: Role = role
        .parse()
        .map_err(|_| UserError::InvalidRole(role.to_owned()))?;

    let store = PgStore::new(connect().await?);
    let registration = Registration {
        first_name: first_name.to_owned(),
        last_name: last_name.to_owned(),
        email: email.to_owned(),
        password: password.to_owned(),
        phone: None,
    };

    let user = AuthService::new(&store)
        .provision(&registration, role)
        .await?;

    tracing::info!(
        "Account created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    Ok(())
}
