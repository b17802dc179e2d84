//! Request middleware for the storefront API.
//!
//! `main` wraps the router in this order, outermost first:
//!
//! ```text
//! sentry -> cors -> trace -> request id -> security headers -> session
//! ```
//!
//! Rate limiters are attached per route group in [`crate::routes`], and the
//! auth extractors read the user stored in the session.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, clear_current_user, set_current_user};
pub use rate_limit::{api_rate_limiter, auth_rate_limiter, visitor_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
