//! The product synchronization engine.
//!
//! - [`classify`] - shape classification and attribute-matrix construction
//! - [`identity`] - deterministic SKU/barcode derivation
//! - [`payload`] - outbound payload building and pre-flight validation
//! - [`reconciler`] - mapping-aware upsert against the channel
//! - [`divergence`] - type-aware local-vs-snapshot comparison
//! - [`queue`] - export queue batch processor

pub mod classify;
pub mod divergence;
pub mod identity;
pub mod payload;
pub mod queue;
pub mod reconciler;

use thiserror::Error;
use vitrine_core::ProductId;

use crate::channel::ChannelError;
use crate::db::RepositoryError;
use crate::tenant::TenantError;

/// Errors raised by the sync engine.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No tenant context was established for the calling task.
    #[error(transparent)]
    Tenant(#[from] TenantError),

    /// Local database failure. Always surfaced, never swallowed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Channel API failure.
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// The requested local product does not exist.
    #[error("local product {0} not found")]
    ProductNotFound(ProductId),

    /// The requested product is a declared variant; it is reconciled through
    /// its parent.
    #[error("product {product} is a variant of {parent}; sync the parent instead")]
    IsVariant {
        product: ProductId,
        parent: ProductId,
    },
}
