//! Sync server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SYNC_TENANTS` - Comma-separated `tag=postgres-url` pairs, one per tenant
//!   (e.g. `acme=postgres://db1/acme,globex=postgres://db2/globex`)
//! - `SYNC_BASE_URL` - Public URL of this server (used for webhook registration)
//! - `CHANNEL_API_BASE` - Base URL of the storefront channel REST API
//!
//! ## Optional
//! - `SYNC_HOST` - Bind address (default: 127.0.0.1)
//! - `SYNC_PORT` - Listen port (default: 3002)
//! - `CHANNEL_PLATFORM` - Platform name recorded on mirrored orders (default: storefront)
//! - `CHANNEL_TIMEOUT_SECS` - Per-call channel timeout (default: 20)
//! - `CHANNEL_CREDENTIAL_TTL_SECS` - Credential cache TTL (default: 60)
//! - `SYNC_PRICE_TOLERANCE` - Divergence tolerance for price comparisons (default: 0.10)
//! - `SYNC_STOCK_FLOOR` - Lower clamp for stock mutations (default: 0)
//! - `SYNC_QUEUE_BATCH_SIZE` - Export queue claim size (default: 25)
//! - `SYNC_QUEUE_MAX_ATTEMPTS` - Attempts before an entry is parked (default: 5)
//! - `SYNC_QUEUE_INTERVAL_SECS` - Queue worker poll interval (default: 30)
//! - `SYNC_ALLOW_UNSIGNED_WEBHOOKS` - Accept unsigned deliveries (testing only!)
//! - `SENTRY_DSN` / `SENTRY_ENVIRONMENT` / `SENTRY_SAMPLE_RATE` /
//!   `SENTRY_TRACES_SAMPLE_RATE` - Error tracking

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Sync server configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of this server
    pub base_url: String,
    /// Configured tenants (tag + isolated database)
    pub tenants: Vec<TenantConfig>,
    /// Storefront channel API configuration
    pub channel: ChannelConfig,
    /// Sync policy constants
    pub policy: SyncPolicy,
    /// Webhook handling configuration
    pub webhook: WebhookConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// A single tenant's routing entry.
///
/// Implements `Debug` manually to redact the database URL (contains a
/// password).
#[derive(Clone)]
pub struct TenantConfig {
    /// Short tag identifying the tenant in URLs and logs.
    pub tag: String,
    /// `PostgreSQL` connection string for the tenant's isolated database.
    pub database_url: SecretString,
}

impl std::fmt::Debug for TenantConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantConfig")
            .field("tag", &self.tag)
            .field("database_url", &"[REDACTED]")
            .finish()
    }
}

/// Storefront channel API configuration.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Base URL of the channel REST API (e.g. `https://api.channel.example/v1`).
    pub api_base: String,
    /// Platform name recorded on mirrored orders.
    pub platform: String,
    /// Hard per-call timeout.
    pub timeout: Duration,
    /// TTL for cached per-tenant credentials.
    pub credential_ttl: Duration,
}

/// Policy constants for reconciliation and inventory application.
///
/// These were policy choices in the original back-office; they are carried as
/// configuration rather than literals.
#[derive(Debug, Clone)]
pub struct SyncPolicy {
    /// Price differences at or below this value are not divergences.
    pub price_tolerance: Decimal,
    /// Lower clamp applied to every stock mutation.
    pub stock_floor: Decimal,
    /// Export queue entries claimed per batch.
    pub queue_batch_size: i64,
    /// Attempts before an export queue entry is excluded from claims.
    pub queue_max_attempts: i32,
    /// Export queue worker poll interval.
    pub queue_interval: Duration,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            price_tolerance: Decimal::new(10, 2), // 0.10
            stock_floor: Decimal::ZERO,
            queue_batch_size: 25,
            queue_max_attempts: 5,
            queue_interval: Duration::from_secs(30),
        }
    }
}

/// Webhook handling configuration.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Accept deliveries without a valid signature.
    ///
    /// For controlled non-production testing only; every accepted unsigned
    /// delivery is logged at WARN.
    pub allow_unsigned: bool,
}

impl SyncConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("SYNC_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("SYNC_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("SYNC_PORT", "3002")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SYNC_PORT".to_string(), e.to_string()))?;
        let base_url = get_required_env("SYNC_BASE_URL")?;

        let tenants = parse_tenants(&get_required_env("SYNC_TENANTS")?)?;
        if tenants.is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "SYNC_TENANTS".to_string(),
                "at least one tenant must be configured".to_string(),
            ));
        }

        let channel = ChannelConfig::from_env()?;
        let policy = SyncPolicy::from_env()?;
        let webhook = WebhookConfig {
            allow_unsigned: get_optional_env("SYNC_ALLOW_UNSIGNED_WEBHOOKS")
                .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
        };

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            host,
            port,
            base_url,
            tenants,
            channel,
            policy,
            webhook,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl ChannelConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let timeout_secs = get_env_or_default("CHANNEL_TIMEOUT_SECS", "20")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("CHANNEL_TIMEOUT_SECS".to_string(), e.to_string())
            })?;
        let credential_ttl_secs = get_env_or_default("CHANNEL_CREDENTIAL_TTL_SECS", "60")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("CHANNEL_CREDENTIAL_TTL_SECS".to_string(), e.to_string())
            })?;

        Ok(Self {
            api_base: get_required_env("CHANNEL_API_BASE")?
                .trim_end_matches('/')
                .to_string(),
            platform: get_env_or_default("CHANNEL_PLATFORM", "storefront"),
            timeout: Duration::from_secs(timeout_secs),
            credential_ttl: Duration::from_secs(credential_ttl_secs),
        })
    }
}

impl SyncPolicy {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let price_tolerance = parse_env_decimal("SYNC_PRICE_TOLERANCE", defaults.price_tolerance)?;
        let stock_floor = parse_env_decimal("SYNC_STOCK_FLOOR", defaults.stock_floor)?;
        let queue_batch_size = parse_env_number("SYNC_QUEUE_BATCH_SIZE", defaults.queue_batch_size)?;
        let queue_max_attempts =
            parse_env_number("SYNC_QUEUE_MAX_ATTEMPTS", defaults.queue_max_attempts)?;
        let queue_interval_secs = parse_env_number(
            "SYNC_QUEUE_INTERVAL_SECS",
            defaults.queue_interval.as_secs(),
        )?;

        Ok(Self {
            price_tolerance,
            stock_floor,
            queue_batch_size,
            queue_max_attempts,
            queue_interval: Duration::from_secs(queue_interval_secs),
        })
    }
}

/// Parse the `SYNC_TENANTS` variable (`tag=url,tag=url`).
fn parse_tenants(raw: &str) -> Result<Vec<TenantConfig>, ConfigError> {
    let mut tenants = Vec::new();
    for token in raw.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Some((tag, url)) = trimmed.split_once('=') else {
            return Err(ConfigError::InvalidEnvVar(
                "SYNC_TENANTS".to_string(),
                format!("malformed entry (expected tag=url): {trimmed}"),
            ));
        };
        let tag = tag.trim();
        let url = url.trim();
        if tag.is_empty() || url.is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "SYNC_TENANTS".to_string(),
                format!("malformed entry (empty tag or url): {trimmed}"),
            ));
        }
        if tenants.iter().any(|t: &TenantConfig| t.tag == tag) {
            return Err(ConfigError::InvalidEnvVar(
                "SYNC_TENANTS".to_string(),
                format!("duplicate tenant tag: {tag}"),
            ));
        }
        tenants.push(TenantConfig {
            tag: tag.to_string(),
            database_url: SecretString::from(url.to_string()),
        });
    }
    Ok(tenants)
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env_decimal(key: &str, default: Decimal) -> Result<Decimal, ConfigError> {
    match get_optional_env(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<Decimal>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
    }
}

fn parse_env_number<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match get_optional_env(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tenants_multiple() {
        let tenants =
            parse_tenants("acme=postgres://db1/acme, globex=postgres://db2/globex").unwrap();
        assert_eq!(tenants.len(), 2);
        assert_eq!(tenants[0].tag, "acme");
        assert_eq!(tenants[1].tag, "globex");
    }

    #[test]
    fn test_parse_tenants_skips_empty_entries() {
        let tenants = parse_tenants("acme=postgres://db1/acme,,").unwrap();
        assert_eq!(tenants.len(), 1);
    }

    #[test]
    fn test_parse_tenants_rejects_malformed() {
        assert!(parse_tenants("acme").is_err());
        assert!(parse_tenants("=postgres://db1/acme").is_err());
        assert!(parse_tenants("acme=").is_err());
    }

    #[test]
    fn test_parse_tenants_rejects_duplicate_tags() {
        let result = parse_tenants("acme=postgres://a,acme=postgres://b");
        assert!(result.is_err());
    }

    #[test]
    fn test_tenant_config_debug_redacts_url() {
        let tenant = TenantConfig {
            tag: "acme".to_string(),
            database_url: SecretString::from("postgres://user:hunter2@db/acme"),
        };
        let debug_output = format!("{tenant:?}");
        assert!(debug_output.contains("acme"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("hunter2"));
    }

    #[test]
    fn test_policy_defaults() {
        let policy = SyncPolicy::default();
        assert_eq!(policy.price_tolerance, Decimal::new(10, 2));
        assert_eq!(policy.stock_floor, Decimal::ZERO);
        assert_eq!(policy.queue_batch_size, 25);
        assert_eq!(policy.queue_max_attempts, 5);
    }
}
