//! Key-value storage for plugin state.
//!
//! # Database: `relay` schema
//!
//! ## Tables
//!
//! - `kv_store` - Opaque values keyed by string (one row per connected user)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/relay/migrations/` and run via:
//! ```bash
//! cargo run -p jenkins-relay-cli -- migrate
//! ```
//!
//! Without a database the relay falls back to [`MemoryKvStore`], which loses
//! every stored credential on restart.

mod memory;
mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use memory::MemoryKvStore;
pub use postgres::PgKvStore;

/// Errors that can occur during key-value operations.
#[derive(Debug, Error)]
pub enum KvError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Byte-valued key-value store with last-write-wins semantics.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), KvError>;

    /// Remove `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), KvError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
