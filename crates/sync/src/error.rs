//! Unified error handling for the sync server.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::channel::ChannelError;
use crate::db::RepositoryError;
use crate::sync::SyncError;
use crate::tenant::TenantError;
use crate::webhooks::{SignatureError, WebhookError};

/// Application-level error type for HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Tenant routing failed.
    #[error("Tenant error: {0}")]
    Tenant(#[from] TenantError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Channel API operation failed.
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Sync engine failure.
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// Webhook handling failure.
    #[error("Webhook error: {0}")]
    Webhook(#[from] WebhookError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            // The tenant system is not configured for this request.
            Self::Tenant(TenantError::UnknownTenant(_))
            | Self::Channel(ChannelError::NotConfigured)
            | Self::Sync(SyncError::Channel(ChannelError::NotConfigured))
            | Self::Webhook(WebhookError::Channel(ChannelError::NotConfigured)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            // Authenticity failures.
            Self::Webhook(WebhookError::Signature(
                SignatureError::Missing | SignatureError::Mismatch,
            )) => StatusCode::UNAUTHORIZED,
            // Malformed deliveries and requests.
            Self::Webhook(WebhookError::MissingOrderId | WebhookError::InvalidBody(_))
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Sync request error"
            );
        }

        // Don't expose internal error details to clients
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            match &self {
                Self::Channel(_) | Self::Webhook(WebhookError::Channel(_)) => {
                    "External service error".to_string()
                }
                _ => "Internal server error".to_string(),
            }
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product 123".to_string());
        assert_eq!(err.to_string(), "Not found: product 123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_status_mapping_matches_webhook_contract() {
        // 401 on signature failure
        assert_eq!(
            AppError::Webhook(WebhookError::Signature(SignatureError::Mismatch)).status(),
            StatusCode::UNAUTHORIZED
        );
        // 400 on missing order id / invalid body
        assert_eq!(
            AppError::Webhook(WebhookError::MissingOrderId).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Webhook(WebhookError::InvalidBody("nope".to_string())).status(),
            StatusCode::BAD_REQUEST
        );
        // 503 when the tenant system is not configured
        assert_eq!(
            AppError::Tenant(TenantError::UnknownTenant("ghost".to_string())).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::Channel(ChannelError::NotConfigured).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        // 500 otherwise
        assert_eq!(
            AppError::Internal("boom".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
