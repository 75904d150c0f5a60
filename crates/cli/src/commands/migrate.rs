//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! jr-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `RELAY_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! Migration files live in `crates/relay/migrations/`.

use sqlx::PgPool;
use thiserror::Error;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A migration failed to apply.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run the relay's database migrations.
pub async fn run() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("RELAY_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| MigrationError::MissingEnvVar("RELAY_DATABASE_URL"))?;

    tracing::info!("Connecting to relay database...");
    let pool = PgPool::connect(&database_url).await?;

    tracing::info!("Running relay migrations...");
    sqlx::migrate!("../relay/migrations").run(&pool).await?;

    tracing::info!("Relay migrations complete!");
    Ok(())
}
