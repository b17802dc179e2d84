//! Per-IP rate limits built on `tower_governor`.
//!
//! | Limiter                  | Applied to                  | Budget                    |
//! |--------------------------|-----------------------------|---------------------------|
//! | [`auth_rate_limiter`]    | register, login             | burst 5, +1 every 6s      |
//! | [`api_rate_limiter`]     | everything under `/api`     | burst 50, +1 every second |
//! | [`visitor_rate_limiter`] | `POST /api/visitors`        | 1 visit per 5 minutes     |

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{
    GovernorError, GovernorLayer, governor::GovernorConfigBuilder, key_extractor::KeyExtractor,
};

/// Proxy headers carrying the client address, in order of trust. For
/// `X-Forwarded-For` the first hop is used.
const CLIENT_IP_HEADERS: [&str; 4] = [
    "cf-connecting-ip",
    "x-forwarded-for",
    "x-real-ip",
    "fly-client-ip",
];

/// Keys requests by the shopper's address rather than the proxy's.
///
/// Without any usable proxy header the socket peer is used.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

fn header_ip(headers: &HeaderMap, name: &str) -> Option<IpAddr> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

impl KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let headers = req.headers();
        if let Some(ip) = CLIENT_IP_HEADERS
            .iter()
            .find_map(|name| header_ip(headers, name))
        {
            return Ok(ip);
        }

        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Build a limiter that refills one request every `refill_secs` seconds up to
/// `burst` stored requests.
///
/// # Panics
///
/// Panics if `refill_secs` or `burst` is zero. Every caller below passes
/// positive constants.
fn limiter(refill_secs: u64, burst: u32) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(refill_secs)
        .burst_size(burst)
        .finish()
        .expect("rate limiter periods and bursts are non-zero");
    GovernorLayer::new(Arc::new(config))
}

/// About ten attempts a minute against the credential endpoints.
#[must_use]
pub fn auth_rate_limiter() -> RateLimiterLayer {
    limiter(6, 5)
}

#[must_use]
pub fn api_rate_limiter() -> RateLimiterLayer {
    limiter(1, 50)
}

/// Page reloads inside the window are rejected instead of inflating the
/// visit count.
#[must_use]
pub fn visitor_rate_limiter() -> RateLimiterLayer {
    limiter(300, 1)
}
