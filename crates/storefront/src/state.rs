//! Handler state.
//!
//! Everything a request needs lives behind the store; configuration is
//! consumed once at startup in `main` and never read by handlers.

use sqlx::PgPool;

use crate::db::PgStore;

/// State handed to every axum handler. Cloning copies a pool handle.
#[derive(Clone)]
pub struct AppState {
    store: PgStore,
}

impl AppState {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self {
            store: PgStore::new(pool),
        }
    }

    /// The Postgres-backed store every service runs against.
    #[must_use]
    pub const fn store(&self) -> &PgStore {
        &self.store
    }

    /// Raw pool, for repositories that sit outside the store traits
    /// (contact inbox, health probe).
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        self.store.pool()
    }
}
