//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dryfruit_core::{Email, Role, UserId};

/// A storefront account (shopper, admin, or delivery partner).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login email, normalized.
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    /// Default delivery address.
    pub address: Option<String>,
    pub role: Role,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// "First Last", trimmed.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_owned()
    }
}

/// Fields collected at sign-up.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: Role,
}

/// Partial profile update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl ProfileUpdate {
    /// Trim every field and drop blank names, which cannot be cleared.
    #[must_use]
    pub fn normalized(self) -> Self {
        let trim = |s: Option<String>| s.map(|v| v.trim().to_owned());
        Self {
            first_name: trim(self.first_name).filter(|s| !s.is_empty()),
            last_name: trim(self.last_name).filter(|s| !s.is_empty()),
            phone: trim(self.phone),
            address: trim(self.address),
        }
    }
}
