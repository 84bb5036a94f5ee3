//! Seed a tenant database with demo catalog data.
//!
//! Inserts one standalone product and one parent with two size variants,
//! plus a placeholder channel integration, so a fresh tenant can exercise
//! the full sync path immediately.

use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;

use vitrine_sync::config::SyncConfig;

/// Seed command errors.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("configuration error: {0}")]
    Config(#[from] vitrine_sync::config::ConfigError),

    #[error("unknown tenant: {0}")]
    UnknownTenant(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Seed the tenant's database.
///
/// # Errors
///
/// Returns `SeedError` when the tenant is unknown or an insert fails.
pub async fn run(tag: &str) -> Result<(), SeedError> {
    let config = SyncConfig::from_env()?;
    let tenant = config
        .tenants
        .iter()
        .find(|t| t.tag == tag)
        .ok_or_else(|| SeedError::UnknownTenant(tag.to_string()))?;

    let pool = PgPool::connect(tenant.database_url.expose_secret()).await?;

    let standalone = insert_product(
        &pool,
        "Caneca Esmaltada 300ml",
        Some("7891234567895"),
        "39.90",
        "25",
        Some("101"),
    )
    .await?;
    tracing::info!(product_id = standalone, "Seeded standalone product");

    let parent = insert_product(&pool, "Camiseta Basica", None, "59.90", "0", Some("102")).await?;
    let small = insert_product(
        &pool,
        "Camiseta Basica P",
        Some("7891234567901"),
        "59.90",
        "10",
        Some("102"),
    )
    .await?;
    let medium = insert_product(
        &pool,
        "Camiseta Basica M",
        Some("7891234567902"),
        "59.90",
        "12",
        Some("102"),
    )
    .await?;

    insert_grade(&pool, parent, small, "Tamanho", "P", 1).await?;
    insert_grade(&pool, parent, medium, "Tamanho", "M", 2).await?;
    tracing::info!(parent_id = parent, "Seeded parent product with 2 variants");

    sqlx::query(
        "INSERT INTO channel_integrations (store_id, access_token, webhook_secret, active) \
         VALUES ($1, $2, $3, TRUE) \
         ON CONFLICT DO NOTHING",
    )
    .bind("demo-store")
    .bind("tok_replace_me")
    .bind("whsec_replace_me")
    .execute(&pool)
    .await?;
    tracing::info!(tenant = %tag, "Seed complete");

    Ok(())
}

async fn insert_product(
    pool: &PgPool,
    description: &str,
    gtin: Option<&str>,
    price: &str,
    stock: &str,
    category: Option<&str>,
) -> Result<i64, SeedError> {
    let price: Decimal = price.parse().unwrap_or_default();
    let stock: Decimal = stock.parse().unwrap_or_default();

    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO products (description, gtin, price, stock, category) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id",
    )
    .bind(description)
    .bind(gtin)
    .bind(price)
    .bind(stock)
    .bind(category)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

async fn insert_grade(
    pool: &PgPool,
    parent: i64,
    variant: i64,
    axis_name: &str,
    axis_value: &str,
    position: i32,
) -> Result<(), SeedError> {
    sqlx::query(
        "INSERT INTO product_grades (parent_id, variant_id, axis_name, axis_value, position) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (parent_id, variant_id) DO NOTHING",
    )
    .bind(parent)
    .bind(variant)
    .bind(axis_name)
    .bind(axis_value)
    .bind(position)
    .execute(pool)
    .await?;

    Ok(())
}
