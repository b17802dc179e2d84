//! Session-related types.
//!
//! Types stored in the session for authentication state, and the caller
//! identity handed to services.

use serde::{Deserialize, Serialize};

use dryfruit_core::{Email, Role, UserId};

use super::user::User;

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Role at login time.
    pub role: Role,
    pub first_name: String,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
            first_name: user.first_name.clone(),
        }
    }
}

impl CurrentUser {
    /// The identity passed to service operations.
    #[must_use]
    pub const fn caller(&self) -> Caller {
        Caller {
            user_id: self.id,
            role: self.role,
        }
    }
}

/// Verified identity of whoever invokes a service operation.
///
/// Services check capabilities against this value before reading or mutating
/// anything; nothing is inferred from ambient request state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub role: Role,
}

impl Caller {
    #[must_use]
    pub const fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Whether the caller holds one of `roles`.
    #[must_use]
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";
}
