//! `PostgreSQL` key-value store.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use super::{KvError, KvStore};

/// [`KvStore`] persisted in `relay.kv_store`.
#[derive(Debug, Clone)]
pub struct PgKvStore {
    pool: PgPool,
}

impl PgKvStore {
    /// Create a store using the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KvStore for PgKvStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        let value = sqlx::query_scalar::<_, Vec<u8>>("SELECT value FROM relay.kv_store WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    #[instrument(skip(self, value), fields(len = value.len()))]
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), KvError> {
        sqlx::query(
            r"
            INSERT INTO relay.kv_store (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE
            SET value = EXCLUDED.value, updated_at = NOW()
            ",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<(), KvError> {
        sqlx::query("DELETE FROM relay.kv_store WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
