//! Vitrine CLI - Tenant database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run migrations for one tenant
//! vitrine-cli migrate tenant acme
//!
//! # Run migrations for every configured tenant
//! vitrine-cli migrate all
//!
//! # Seed a tenant database with demo catalog data
//! vitrine-cli seed acme
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations across tenant databases
//! - `seed` - Seed a tenant database with demo products and grades

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "vitrine-cli")]
#[command(author, version, about = "Vitrine CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        target: MigrateTarget,
    },
    /// Seed a tenant database with demo catalog data
    Seed {
        /// Tenant tag from SYNC_TENANTS
        tag: String,
    },
}

#[derive(Subcommand)]
enum MigrateTarget {
    /// Run migrations for one tenant
    Tenant {
        /// Tenant tag from SYNC_TENANTS
        tag: String,
    },
    /// Run migrations for every configured tenant
    All,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate { target } => match target {
            MigrateTarget::Tenant { tag } => commands::migrate::tenant(&tag).await?,
            MigrateTarget::All => commands::migrate::all().await?,
        },
        Commands::Seed { tag } => commands::seed::run(&tag).await?,
    }
    Ok(())
}
