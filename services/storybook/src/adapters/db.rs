//! services/storybook/src/adapters/db.rs
//!
//! This module contains the database adapter, a concrete implementation of the
//! `KeyValueStore` port backed by a `kv_store` table in PostgreSQL via `sqlx`.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use storybook_core::ports::{KeyValueStore, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `KeyValueStore` port.
#[derive(Clone)]
pub struct PgKeyValueStore {
    pool: PgPool,
}

impl PgKeyValueStore {
    /// Creates a new `PgKeyValueStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct KvRecord {
    value: String,
}

fn to_port_error(e: sqlx::Error) -> PortError {
    PortError::Unavailable(e.to_string())
}

//=========================================================================================
// `KeyValueStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl KeyValueStore for PgKeyValueStore {
    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        let record = sqlx::query_as::<_, KvRecord>(
            "SELECT value FROM kv_store WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(to_port_error)?;
        Ok(record.map(|r| r.value))
    }

    async fn set(&self, key: &str, value: &str) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO kv_store (key, value, updated_at) VALUES ($1, $2, NOW()) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(to_port_error)?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(to_port_error)?;
        Ok(())
    }
}
