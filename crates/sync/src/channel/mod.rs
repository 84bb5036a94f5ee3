//! Storefront channel REST API client.
//!
//! Translates local intents (create/update products and variants, manage
//! images and webhook subscriptions, fetch orders) into authenticated HTTP
//! calls, scoped by the current tenant's store ID and access token. No
//! retries live at this layer; retry policy belongs to callers.

pub mod client;
pub mod types;

use thiserror::Error;

pub use client::ChannelClient;

use crate::db::RepositoryError;
use crate::tenant::TenantError;

/// Maximum response-body length carried in an [`ChannelError::Api`] error.
const MAX_ERROR_BODY: usize = 512;

/// Errors raised by the channel client.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// No tenant context was established for the calling task.
    #[error(transparent)]
    Tenant(#[from] TenantError),

    /// Credential lookup in the tenant database failed.
    #[error("credential lookup failed: {0}")]
    Repository(#[from] RepositoryError),

    /// The tenant has no active channel integration.
    #[error("tenant has no active channel integration")]
    NotConfigured,

    /// The call exceeded the hard per-call timeout. Retryable.
    #[error("channel request timed out")]
    Timeout,

    /// Transport-level failure from reqwest.
    #[error("channel transport error: {0}")]
    Http(reqwest::Error),

    /// The channel rejected the credentials.
    #[error("channel rejected credentials: {0}")]
    Unauthorized(String),

    /// The remote entity does not exist.
    #[error("remote entity not found: {0}")]
    NotFound(String),

    /// The channel asked us to back off (seconds until retry).
    #[error("channel rate limited, retry after {0}s")]
    RateLimited(u64),

    /// The store hit the channel's category cap. Aborts the whole product
    /// sync with a kind the caller can distinguish from generic API errors.
    #[error("channel category limit reached: {0}")]
    CategoryLimit(String),

    /// Any other non-2xx response.
    #[error("channel API error (status {status}): {body}")]
    Api { status: u16, body: String },
}

impl ChannelError {
    /// Whether a caller (or the export queue) may retry the operation.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::RateLimited(_) | Self::Http(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Classify a non-2xx response into an error kind.
    pub(crate) fn from_response(status: u16, body: &str) -> Self {
        let truncated: String = body.chars().take(MAX_ERROR_BODY).collect();
        match status {
            401 | 403 => Self::Unauthorized(truncated),
            404 => Self::NotFound(truncated),
            422 if is_category_limit(&truncated) => Self::CategoryLimit(truncated),
            _ => Self::Api {
                status,
                body: truncated,
            },
        }
    }
}

impl From<reqwest::Error> for ChannelError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(e)
        }
    }
}

/// The channel signals its category cap as a 422 whose body names the limit.
fn is_category_limit(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("categor") && lower.contains("limit")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_response_classifies_status() {
        assert!(matches!(
            ChannelError::from_response(401, "bad token"),
            ChannelError::Unauthorized(_)
        ));
        assert!(matches!(
            ChannelError::from_response(404, "gone"),
            ChannelError::NotFound(_)
        ));
        assert!(matches!(
            ChannelError::from_response(500, "boom"),
            ChannelError::Api { status: 500, .. }
        ));
    }

    #[test]
    fn test_category_limit_is_distinguishable() {
        let err =
            ChannelError::from_response(422, r#"{"error":"store category limit exceeded"}"#);
        assert!(matches!(err, ChannelError::CategoryLimit(_)));

        // An unrelated 422 stays a generic API error.
        let err = ChannelError::from_response(422, r#"{"error":"name is required"}"#);
        assert!(matches!(err, ChannelError::Api { status: 422, .. }));
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(ChannelError::Timeout.is_retryable());
        assert!(ChannelError::RateLimited(30).is_retryable());
        assert!(
            ChannelError::Api {
                status: 503,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(
            !ChannelError::Api {
                status: 422,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(!ChannelError::Unauthorized(String::new()).is_retryable());
        assert!(!ChannelError::CategoryLimit(String::new()).is_retryable());
    }

    #[test]
    fn test_error_body_truncated() {
        let long_body = "x".repeat(10_000);
        if let ChannelError::Api { body, .. } = ChannelError::from_response(500, &long_body) {
            assert_eq!(body.len(), MAX_ERROR_BODY);
        } else {
            panic!("expected Api error");
        }
    }
}
