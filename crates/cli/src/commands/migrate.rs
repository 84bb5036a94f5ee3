//! Database migration commands.
//!
//! Migrations live in `crates/sync/migrations/` and are applied to each
//! tenant database named in `SYNC_TENANTS`.

use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;

use vitrine_sync::config::{SyncConfig, TenantConfig};

/// Migration command errors.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("configuration error: {0}")]
    Config(#[from] vitrine_sync::config::ConfigError),

    #[error("unknown tenant: {0}")]
    UnknownTenant(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run migrations for one tenant.
///
/// # Errors
///
/// Returns `MigrationError` when the tenant is unknown or the migration
/// fails.
pub async fn tenant(tag: &str) -> Result<(), MigrationError> {
    let config = SyncConfig::from_env()?;
    let tenant = config
        .tenants
        .iter()
        .find(|t| t.tag == tag)
        .ok_or_else(|| MigrationError::UnknownTenant(tag.to_string()))?;

    migrate_one(tenant).await
}

/// Run migrations for every configured tenant.
///
/// # Errors
///
/// Returns `MigrationError` at the first tenant that fails.
pub async fn all() -> Result<(), MigrationError> {
    let config = SyncConfig::from_env()?;
    for tenant in &config.tenants {
        migrate_one(tenant).await?;
    }
    Ok(())
}

async fn migrate_one(tenant: &TenantConfig) -> Result<(), MigrationError> {
    tracing::info!(tenant = %tenant.tag, "Connecting to tenant database...");
    let pool = PgPool::connect(tenant.database_url.expose_secret()).await?;

    tracing::info!(tenant = %tenant.tag, "Running migrations...");
    sqlx::migrate!("../sync/migrations").run(&pool).await?;

    tracing::info!(tenant = %tenant.tag, "Migrations complete");
    Ok(())
}
