//! Authentication extractors.
//!
//! The session stores a [`CurrentUser`] at login. On every request the
//! extractors re-read that account so role changes and deletions apply to
//! sessions that are already open. Role checks happen in the services
//! against the extracted identity.

use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;

use crate::db::users::UserRepository;
use crate::error::AppError;
use crate::models::{CurrentUser, User, session_keys};
use crate::services::ServiceError;
use crate::state::AppState;

/// Extractor that requires a logged-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.first_name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Why an authenticated route refused the request.
pub enum AuthRejection {
    /// No session, or its account no longer exists.
    LoggedOut,
    /// The account lookup failed.
    Lookup(AppError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::LoggedOut => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "success": false, "message": "Not authorized, please log in" })),
            )
                .into_response(),
            Self::Lookup(err) => err.into_response(),
        }
    }
}

/// Identity to continue the session with, given the account as stored now.
///
/// `None` means the account was deleted and the session must end.
pub fn refreshed_identity(stored: Option<&User>) -> Option<CurrentUser> {
    stored.map(CurrentUser::from)
}

async fn session_user(parts: &Parts, state: &AppState) -> Result<Option<CurrentUser>, AppError> {
    let Some(session) = parts.extensions.get::<Session>() else {
        return Ok(None);
    };
    let Some(remembered) = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
    else {
        return Ok(None);
    };

    let stored = UserRepository::new(state.pool())
        .get_by_id(remembered.id)
        .await
        .map_err(ServiceError::from)?;

    let Some(current) = refreshed_identity(stored.as_ref()) else {
        tracing::info!(user_id = %remembered.id, "Session account no longer exists");
        if let Err(e) = session.flush().await {
            tracing::warn!(error = %e, "Failed to end orphaned session");
        }
        return Ok(None);
    };

    if current.role != remembered.role {
        tracing::info!(
            user_id = %current.id,
            from = %remembered.role,
            to = %current.role,
            "Session role refreshed"
        );
        if let Err(e) = session.insert(session_keys::CURRENT_USER, &current).await {
            tracing::warn!(error = %e, "Failed to store refreshed session user");
        }
    }
    Ok(Some(current))
}

impl<S> FromRequestParts<S> for RequireAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let user = session_user(parts, &state)
            .await
            .map_err(AuthRejection::Lookup)?
            .ok_or(AuthRejection::LoggedOut)?;
        tracing::Span::current().record("user_id", user.id.as_i32());
        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject anonymous requests.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        Ok(Self(session_user(parts, &state).await?))
    }
}

/// Store the logged-in user in the session.
///
/// The session id is cycled first so a pre-login id can't be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Remove the user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use dryfruit_core::{Email, PaymentMethod, ProductId, Role, UserId, VariantId};

    use super::*;
    use crate::models::{Caller, ShippingInfo};
    use crate::models::product::fixtures::product;
    use crate::services::cart::CartService;
    use crate::services::orders::OrderService;
    use crate::store::memory::MemoryStore;

    fn account(role: Role) -> User {
        let now = Utc::now();
        User {
            id: UserId::new(1),
            email: Email::parse("ops@dryfruitjunction.in").unwrap(),
            first_name: "Ravi".to_owned(),
            last_name: "Kumar".to_owned(),
            phone: None,
            address: None,
            role,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_deleted_account_ends_session() {
        assert!(refreshed_identity(None).is_none());
    }

    #[tokio::test]
    async fn test_demoted_admin_loses_status_rights() {
        let store = MemoryStore::new();
        store.insert_product(product(1, "Kaju Katli", &[("500g", 500, 10)]));
        let shopper = Caller::new(UserId::new(7), Role::User);
        CartService::new(&store)
            .add_to_cart(&shopper, ProductId::new(1), VariantId::new(101), 1)
            .await
            .unwrap();
        let shipping: ShippingInfo = serde_json::from_value(json!({
            "name": "Asha Rao",
            "email": "asha@example.com",
            "phone": "9876543210",
            "pincode": "560001",
            "address": "12 MG Road",
            "city": "Bengaluru"
        }))
        .unwrap();
        let orders = OrderService::new(&store);
        let order = orders
            .create_order(&shopper, &shipping, PaymentMethod::Cod)
            .await
            .unwrap();

        let remembered = CurrentUser::from(&account(Role::Admin));
        let current = refreshed_identity(Some(&account(Role::User))).unwrap();
        assert_eq!(remembered.role, Role::Admin);
        assert_eq!(current.role, Role::User);

        let err = orders
            .update_status(&current.caller(), order.id, "shipped")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }
}
