//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MARKETPLACE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `MARKETPLACE_JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `MARKETPLACE_HOST` - Bind address (default: 127.0.0.1)
//! - `MARKETPLACE_PORT` - Listen port (default: 5000)
//! - `MARKETPLACE_ACCESS_TOKEN_TTL_MINUTES` - Access token lifetime (default: 60)
//! - `MARKETPLACE_REFRESH_TOKEN_TTL_DAYS` - Refresh token lifetime (default: 30)
//! - `MARKETPLACE_SEED_CATEGORIES` - Comma-separated categories ensured at startup
//!   (default: Electronics,Books,Clothing,Home,Sports)
//! - `MARKETPLACE_CORS_ORIGINS` - Comma-separated allowed origins (default: any)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Traces sample rate (default: 1.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Categories ensured at startup when `MARKETPLACE_SEED_CATEGORIES` is unset.
pub const DEFAULT_SEED_CATEGORIES: &[&str] = &["Electronics", "Books", "Clothing", "Home", "Sports"];

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Token signing configuration
    pub jwt: JwtConfig,
    /// Category names ensured to exist at startup
    pub seed_categories: Vec<String>,
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Signing key and lifetimes for access and refresh tokens.
///
/// Implements `Debug` manually to redact the secret.
#[derive(Clone)]
pub struct JwtConfig {
    /// HMAC signing secret
    pub secret: SecretString,
    /// Access token lifetime
    pub access_ttl: Duration,
    /// Refresh token lifetime
    pub refresh_ttl: Duration,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("MARKETPLACE_DATABASE_URL")?;
        let host = get_env_or_default("MARKETPLACE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("MARKETPLACE_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("MARKETPLACE_PORT", "5000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("MARKETPLACE_PORT".to_string(), e.to_string())
            })?;

        let jwt = JwtConfig::from_env()?;

        let seed_categories = get_optional_env("MARKETPLACE_SEED_CATEGORIES").map_or_else(
            || DEFAULT_SEED_CATEGORIES.iter().map(ToString::to_string).collect(),
            |raw| split_list(&raw),
        );
        let cors_origins = get_optional_env("MARKETPLACE_CORS_ORIGINS")
            .map(|raw| split_list(&raw))
            .unwrap_or_default();

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            database_url,
            host,
            port,
            jwt,
            seed_categories,
            cors_origins,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Load only the database URL, for tools that do not serve HTTP.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if neither
    /// `MARKETPLACE_DATABASE_URL` nor `DATABASE_URL` is set.
    pub fn database_url_from_env() -> Result<SecretString, ConfigError> {
        let _ = dotenvy::dotenv();
        get_database_url("MARKETPLACE_DATABASE_URL")
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl JwtConfig {
    /// Default access token lifetime in minutes.
    pub const DEFAULT_ACCESS_TTL_MINUTES: u64 = 60;
    /// Default refresh token lifetime in days.
    pub const DEFAULT_REFRESH_TTL_DAYS: u64 = 30;

    fn from_env() -> Result<Self, ConfigError> {
        let secret = get_validated_secret("MARKETPLACE_JWT_SECRET")?;
        validate_jwt_secret(&secret, "MARKETPLACE_JWT_SECRET")?;

        let access_minutes = get_positive_u64(
            "MARKETPLACE_ACCESS_TOKEN_TTL_MINUTES",
            Self::DEFAULT_ACCESS_TTL_MINUTES,
        )?;
        let refresh_days = get_positive_u64(
            "MARKETPLACE_REFRESH_TOKEN_TTL_DAYS",
            Self::DEFAULT_REFRESH_TTL_DAYS,
        )?;

        Ok(Self {
            secret,
            access_ttl: scaled_duration(
                "MARKETPLACE_ACCESS_TOKEN_TTL_MINUTES",
                access_minutes,
                60,
            )?,
            refresh_ttl: scaled_duration(
                "MARKETPLACE_REFRESH_TOKEN_TTL_DAYS",
                refresh_days,
                24 * 60 * 60,
            )?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a positive integer environment variable with a default value.
fn get_positive_u64(key: &str, default: u64) -> Result<u64, ConfigError> {
    let Some(raw) = get_optional_env(key) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        )),
        Ok(value) => Ok(value),
        Err(e) => Err(ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
    }
}

/// Convert `value` units of `unit_secs` seconds into a duration.
fn scaled_duration(key: &str, value: u64, unit_secs: u64) -> Result<Duration, ConfigError> {
    value
        .checked_mul(unit_secs)
        .map(Duration::from_secs)
        .ok_or_else(|| ConfigError::InvalidEnvVar(key.to_string(), "value too large".to_string()))
}

/// Split a comma-separated list, dropping blank entries.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_jwt_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
