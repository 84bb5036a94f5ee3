//! Database operations against per-tenant `PostgreSQL` databases.
//!
//! # Tables (per tenant database)
//!
//! - `products` - Local product catalog (system of record)
//! - `product_grades` - Variant declarations binding products to parents
//! - `channel_mappings` - Local -> remote identity mapping and snapshots
//! - `channel_orders` / `channel_order_lines` - Mirror of channel orders
//! - `export_queue` - Best-effort re-sync work items
//! - `channel_integrations` - Per-tenant channel credentials
//!
//! # Migrations
//!
//! Migrations are stored in `crates/sync/migrations/` and run per tenant via:
//! ```bash
//! cargo run -p vitrine-cli -- migrate all
//! ```

pub mod integrations;
pub mod mappings;
pub mod orders;
pub mod products;
pub mod queue;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use integrations::IntegrationRepository;
pub use mappings::MappingRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use queue::ExportQueueRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., two local products mapped to one remote variant).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// One pool is created per tenant database and never shared across tenants.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
