//! Channel integration credentials for the current tenant.
//!
//! Each tenant database holds its own integration record; the channel
//! client reads it through a short-lived cache keyed per tenant, so
//! credential rotation takes effect within the TTL.

use secrecy::SecretString;
use sqlx::PgPool;

use super::RepositoryError;

/// Active channel credentials for a tenant.
///
/// Implements `Debug` manually to redact the token and webhook secret.
#[derive(Clone)]
pub struct ChannelIntegration {
    /// Channel store ID scoping every API call.
    pub store_id: String,
    /// Bearer token for the channel API (redacted in debug output).
    pub access_token: SecretString,
    /// Shared secret for webhook signatures (redacted in debug output).
    pub webhook_secret: SecretString,
}

impl std::fmt::Debug for ChannelIntegration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelIntegration")
            .field("store_id", &self.store_id)
            .field("access_token", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .finish()
    }
}

/// Internal row type for integration queries.
#[derive(Debug, sqlx::FromRow)]
struct IntegrationRow {
    store_id: String,
    access_token: String,
    webhook_secret: String,
}

impl From<IntegrationRow> for ChannelIntegration {
    fn from(row: IntegrationRow) -> Self {
        Self {
            store_id: row.store_id,
            access_token: SecretString::from(row.access_token),
            webhook_secret: SecretString::from(row.webhook_secret),
        }
    }
}

/// Repository for channel integration records.
pub struct IntegrationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> IntegrationRepository<'a> {
    /// Create a new integration repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The tenant's active integration, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active(&self) -> Result<Option<ChannelIntegration>, RepositoryError> {
        let row = sqlx::query_as::<_, IntegrationRow>(
            "SELECT store_id, access_token, webhook_secret \
             FROM channel_integrations \
             WHERE active \
             ORDER BY updated_at DESC \
             LIMIT 1",
        )
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integration_debug_redacts_secrets() {
        let integration = ChannelIntegration {
            store_id: "store-123".to_string(),
            access_token: SecretString::from("tok_super_secret"),
            webhook_secret: SecretString::from("whsec_super_secret"),
        };

        let debug_output = format!("{integration:?}");
        assert!(debug_output.contains("store-123"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("tok_super_secret"));
        assert!(!debug_output.contains("whsec_super_secret"));
    }
}
