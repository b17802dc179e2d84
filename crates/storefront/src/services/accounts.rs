//! Profiles, favorites, and admin user management.

use std::collections::HashMap;

use tracing::instrument;

use dryfruit_core::{ProductId, Role, UserId};

use super::{ServiceError, require_admin};
use crate::db::PgStore;
use crate::db::favorites::FavoriteRepository;
use crate::db::products::ProductRepository;
use crate::db::users::UserRepository;
use crate::models::{Caller, ProductSummary, ProfileUpdate, User};

/// Account operations backed by Postgres.
pub struct AccountService<'a> {
    users: UserRepository<'a>,
    favorites: FavoriteRepository<'a>,
    products: ProductRepository<'a>,
}

impl<'a> AccountService<'a> {
    #[must_use]
    pub fn new(store: &'a PgStore) -> Self {
        let pool = store.pool();
        Self {
            users: UserRepository::new(pool),
            favorites: FavoriteRepository::new(pool),
            products: ProductRepository::new(pool),
        }
    }

    /// The caller's profile.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the account no longer exists.
    pub async fn profile(&self, caller: &Caller) -> Result<User, ServiceError> {
        self.users
            .get_by_id(caller.user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("user"))
    }

    /// Update names, phone, or default address.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the account no longer exists.
    #[instrument(skip(self, update), fields(user_id = %caller.user_id))]
    pub async fn update_profile(
        &self,
        caller: &Caller,
        update: ProfileUpdate,
    ) -> Result<User, ServiceError> {
        self.users
            .update_profile(caller.user_id, &update.normalized())
            .await?
            .ok_or_else(|| ServiceError::not_found("user"))
    }

    /// Favorite products, most recently added first.
    ///
    /// Favorites whose product was deleted are skipped.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Persistence` if the store fails.
    pub async fn favorites(&self, caller: &Caller) -> Result<Vec<ProductSummary>, ServiceError> {
        let ids = self.favorites.list(caller.user_id).await?;
        let mut products: HashMap<ProductId, ProductSummary> = self
            .products
            .get_many(&ids)
            .await?
            .iter()
            .map(|p| (p.id, p.summary()))
            .collect();

        Ok(ids.iter().filter_map(|id| products.remove(id)).collect())
    }

    /// Add or remove a favorite. Returns whether the product is now a favorite.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product doesn't exist.
    #[instrument(skip(self), fields(user_id = %caller.user_id))]
    pub async fn toggle_favorite(
        &self,
        caller: &Caller,
        product_id: ProductId,
    ) -> Result<bool, ServiceError> {
        if self.products.get_by_id(product_id).await?.is_none() {
            return Err(ServiceError::not_found(format!("product {product_id}")));
        }
        Ok(self.favorites.toggle(caller.user_id, product_id).await?)
    }

    /// Every account, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthorized` unless the caller is an admin.
    pub async fn list_users(&self, caller: &Caller) -> Result<Vec<User>, ServiceError> {
        require_admin(caller, "list users")?;
        Ok(self.users.list_all().await?)
    }

    /// Change another account's role.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthorized` unless the caller is an admin.
    /// Returns `ServiceError::InvalidArgument` for an unknown role or when an
    /// admin tries to demote themselves.
    /// Returns `ServiceError::NotFound` if the user doesn't exist.
    #[instrument(skip(self), fields(admin_id = %caller.user_id))]
    pub async fn set_role(
        &self,
        caller: &Caller,
        user_id: UserId,
        role: &str,
    ) -> Result<User, ServiceError> {
        require_admin(caller, "change roles")?;
        let role = parse_role_change(caller, user_id, role)?;

        let user = self
            .users
            .set_role(user_id, role)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("user {user_id}")))?;
        tracing::info!(%user_id, %role, "Role changed");
        Ok(user)
    }
}

fn parse_role_change(caller: &Caller, user_id: UserId, role: &str) -> Result<Role, ServiceError> {
    let role: Role = role
        .parse()
        .map_err(|e: dryfruit_core::ParseEnumError| ServiceError::InvalidArgument(e.to_string()))?;
    if user_id == caller.user_id && !role.is_admin() {
        return Err(ServiceError::InvalidArgument(
            "admins cannot remove their own admin role".to_owned(),
        ));
    }
    Ok(role)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role_change() {
        let admin = Caller::new(UserId::new(1), Role::Admin);

        assert_eq!(
            parse_role_change(&admin, UserId::new(2), "delivery").unwrap(),
            Role::Delivery
        );
        assert!(matches!(
            parse_role_change(&admin, UserId::new(2), "superuser"),
            Err(ServiceError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse_role_change(&admin, UserId::new(1), "user"),
            Err(ServiceError::InvalidArgument(_))
        ));
        assert_eq!(
            parse_role_change(&admin, UserId::new(1), "admin").unwrap(),
            Role::Admin
        );
    }
}
