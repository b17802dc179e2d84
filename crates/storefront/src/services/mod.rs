//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `cart` - Cart line resolution against live variants
//! - `orders` - Cart → order conversion and the status lifecycle
//! - `catalog` - Product listing and admin catalog management
//! - `auth` - Password registration and login (argon2)
//! - `accounts` - Profiles, favorites, and admin user management
//! - `contact` - Contact-form inbox
//! - `visitors` - Site visit counter
//! - `activity` - Best-effort audit logging
//!
//! Every operation that reads or mutates on behalf of a user takes an explicit
//! [`Caller`] and checks its role itself before touching the store.

pub mod accounts;
pub mod activity;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod contact;
mod error;
pub mod orders;
pub mod visitors;

pub use error::ServiceError;

use crate::models::Caller;

/// Fail with `Unauthorized` unless the caller is an admin.
pub(crate) fn require_admin(caller: &Caller, action: &str) -> Result<(), ServiceError> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized(format!("only admins can {action}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use dryfruit_core::{Role, UserId};

    use super::*;

    #[test]
    fn test_require_admin() {
        let admin = Caller::new(UserId::new(1), Role::Admin);
        let courier = Caller::new(UserId::new(2), Role::Delivery);

        assert!(require_admin(&admin, "delete products").is_ok());
        let err = require_admin(&courier, "delete products").unwrap_err();
        assert_eq!(err.to_string(), "not allowed: only admins can delete products");
    }
}
