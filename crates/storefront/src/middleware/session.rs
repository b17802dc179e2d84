//! Cookie sessions persisted in Postgres.
//!
//! The cookie only carries the session id, signed with
//! `STOREFRONT_SESSION_SECRET`; the session record lives in the database.

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use tower_sessions::cookie::{Key, KeyError, SameSite, time::Duration};
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::StorefrontConfig;

pub const SESSION_COOKIE_NAME: &str = "dfj_session";

/// Idle sessions expire after 30 days.
const SESSION_IDLE_DAYS: i64 = 30;

/// `SameSite` policy for the session cookie.
///
/// The React client is served from another origin, so cross-site requests
/// must carry the cookie; browsers only allow `None` on secure cookies.
const fn same_site_policy(secure: bool) -> SameSite {
    if secure { SameSite::None } else { SameSite::Lax }
}

/// Cookie signing key derived from the configured secret.
///
/// # Errors
///
/// Returns `KeyError::TooShort` for secrets under 64 bytes.
pub fn signing_key(secret: &SecretString) -> Result<Key, KeyError> {
    Key::try_from(secret.expose_secret().as_bytes())
}

/// Session layer over the `tower_sessions.session` table created by the
/// storefront migrations.
///
/// # Errors
///
/// Returns an error if the session secret cannot be used as a signing key.
pub fn create_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
) -> Result<SessionManagerLayer<PostgresStore, SignedCookie>, KeyError> {
    let secure = config.is_https();
    let key = signing_key(&config.session_secret)?;

    Ok(SessionManagerLayer::new(PostgresStore::new(pool.clone()))
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::days(SESSION_IDLE_DAYS)))
        .with_secure(secure)
        .with_same_site(same_site_policy(secure))
        .with_http_only(true)
        .with_path("/")
        .with_signed(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_site_follows_transport() {
        assert_eq!(same_site_policy(true), SameSite::None);
        assert_eq!(same_site_policy(false), SameSite::Lax);
    }

    #[test]
    fn test_signing_key_needs_64_bytes() {
        assert!(signing_key(&SecretString::from("k".repeat(63))).is_err());
        assert!(signing_key(&SecretString::from("k".repeat(64))).is_ok());
    }
}
