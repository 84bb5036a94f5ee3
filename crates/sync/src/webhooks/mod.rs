//! Inbound order webhook processing.
//!
//! - [`signature`] - keyed-hash authenticity verification over the raw body
//! - [`orders`] - order normalization and idempotent stock application

pub mod orders;
pub mod signature;

use thiserror::Error;

use crate::channel::ChannelError;
use crate::db::RepositoryError;
use crate::tenant::TenantError;

pub use signature::SignatureError;

/// Errors raised while handling a webhook delivery.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The delivery failed the authenticity gate.
    #[error(transparent)]
    Signature(#[from] SignatureError),

    /// The body carried no numeric `id` field.
    #[error("webhook body has no numeric order id")]
    MissingOrderId,

    /// The body was not valid JSON.
    #[error("invalid webhook body: {0}")]
    InvalidBody(String),

    /// The referenced order does not exist on the channel.
    #[error("order {0} not found on the channel")]
    OrderNotFound(i64),

    /// Channel API failure while fetching the full order.
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// Local database failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// No tenant context was established.
    #[error(transparent)]
    Tenant(#[from] TenantError),
}
