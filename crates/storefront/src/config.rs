//! Storefront configuration, read once from the environment at startup.
//!
//! | Variable                    | Default     | Notes                                        |
//! |-----------------------------|-------------|----------------------------------------------|
//! | `STOREFRONT_DATABASE_URL`   | required    | falls back to `DATABASE_URL`                 |
//! | `STOREFRONT_BASE_URL`       | required    | public API URL; `https://` enables `Secure`  |
//! | `STOREFRONT_SESSION_SECRET` | required    | at least 64 random characters                |
//! | `STOREFRONT_HOST`           | `127.0.0.1` |                                              |
//! | `STOREFRONT_PORT`           | `5000`      |                                              |
//! | `STOREFRONT_CORS_ORIGINS`   | none        | comma-separated client origins               |
//! | `STOREFRONT_LOG_FORMAT`     | `text`      | `json` for structured logs                   |
//! | `SENTRY_DSN`                | none        | error reporting is off without it            |
//! | `SENTRY_ENVIRONMENT`        | none        |                                              |
//! | `SENTRY_SAMPLE_RATE`        | `1.0`       | 0.0 to 1.0                                   |
//! | `SENTRY_TRACES_SAMPLE_RATE` | `0.0`       | 0.0 to 1.0                                   |

use std::collections::HashMap;
use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Matches the minimum key length accepted for signing session cookies.
const MIN_SESSION_SECRET_LENGTH: usize = 64;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Fragments that give away a copied sample value. Matched case-insensitively.
const PLACEHOLDER_FRAGMENTS: &[&str] = &[
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "your-",
    "xxx",
    "todo",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

impl ConfigError {
    fn invalid(key: &str, reason: impl Display) -> Self {
        Self::InvalidEnvVar(key.to_string(), reason.to_string())
    }

    fn insecure(key: &str, reason: impl Into<String>) -> Self {
        Self::InsecureSecret(key.to_string(), reason.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    pub database_url: SecretString,
    pub host: IpAddr,
    pub port: u16,
    pub base_url: String,
    /// Signs the session cookie.
    pub session_secret: SecretString,
    /// Browser origins allowed to make credentialed requests.
    pub cors_origins: Vec<String>,
    pub log_format: LogFormat,
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

impl StorefrontConfig {
    /// Read the configuration, loading `.env` first when present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a required variable is missing, a value
    /// does not parse, or the session secret looks weak.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let database_url = optional("STOREFRONT_DATABASE_URL")
            .or_else(|| optional("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("STOREFRONT_DATABASE_URL".to_string()))?;

        let base_url = required("STOREFRONT_BASE_URL")?;
        Url::parse(&base_url).map_err(|e| ConfigError::invalid("STOREFRONT_BASE_URL", e))?;

        let session_secret = required("STOREFRONT_SESSION_SECRET")?;
        check_secret(&session_secret, "STOREFRONT_SESSION_SECRET")?;

        Ok(Self {
            database_url,
            host: parsed_or("STOREFRONT_HOST", IpAddr::from([127, 0, 0, 1]))?,
            port: parsed_or("STOREFRONT_PORT", 5000)?,
            base_url,
            session_secret: SecretString::from(session_secret),
            cors_origins: parse_origins(
                optional("STOREFRONT_CORS_ORIGINS").as_deref(),
                "STOREFRONT_CORS_ORIGINS",
            )?,
            log_format: LogFormat::parse(optional("STOREFRONT_LOG_FORMAT").as_deref()),
            sentry_dsn: optional("SENTRY_DSN"),
            sentry_environment: optional("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: sample_rate("SENTRY_SAMPLE_RATE", 1.0)?,
            sentry_traces_sample_rate: sample_rate("SENTRY_TRACES_SAMPLE_RATE", 0.0)?,
        })
    }

    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

/// Blank values count as unset.
fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required(key: &str) -> Result<String, ConfigError> {
    optional(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn parsed_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    optional(key).map_or(Ok(default), |raw| {
        raw.trim().parse().map_err(|e| ConfigError::invalid(key, e))
    })
}

fn sample_rate(key: &str, default: f32) -> Result<f32, ConfigError> {
    let rate: f32 = parsed_or(key, default)?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(ConfigError::invalid(key, "must be between 0.0 and 1.0"))
    }
}

/// Normalize each comma-separated entry to its `scheme://host[:port]` origin.
fn parse_origins(raw: Option<&str>, key: &str) -> Result<Vec<String>, ConfigError> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(|origin| {
            Url::parse(origin)
                .map(|url| url.origin().ascii_serialization())
                .map_err(|e| ConfigError::invalid(key, e))
        })
        .collect()
}

/// Shannon entropy in bits per character.
fn entropy_bits_per_char(s: &str) -> f64 {
    let mut counts: HashMap<char, u32> = HashMap::new();
    for c in s.chars() {
        *counts.entry(c).or_default() += 1;
    }
    let total: u32 = counts.values().sum();
    if total == 0 {
        return 0.0;
    }

    let total = f64::from(total);
    counts
        .values()
        .map(|&n| {
            let p = f64::from(n) / total;
            -p * p.log2()
        })
        .sum()
}

fn check_secret(secret: &str, key: &str) -> Result<(), ConfigError> {
    if secret.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::insecure(
            key,
            format!(
                "must be at least {MIN_SESSION_SECRET_LENGTH} characters (got {})",
                secret.len()
            ),
        ));
    }

    let lower = secret.to_lowercase();
    if let Some(fragment) = PLACEHOLDER_FRAGMENTS.iter().find(|f| lower.contains(*f)) {
        return Err(ConfigError::insecure(
            key,
            format!("looks like a placeholder (contains '{fragment}')"),
        ));
    }

    let entropy = entropy_bits_per_char(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::insecure(
            key,
            format!(
                "entropy too low ({entropy:.2} bits/char, need {MIN_ENTROPY_BITS_PER_CHAR:.1}); generate it with `openssl rand -base64 48`"
            ),
        ));
    }

    Ok(())
}
