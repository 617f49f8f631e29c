use std::time::Duration;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use tracing::warn;

use common::{Error, Result};

/// Persisted envelope, one JSON blob per key.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    data: Value,
    /// Epoch millis after which the entry is treated as absent.
    expiry: i64,
}

/// A value read back from the store, with its freshness bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub fetched_at: i64,
    pub expires_at: i64,
}

/// Key→value store with TTL expiry, durable across restarts in SQLite.
///
/// Entries are replaced wholesale on refresh (single upsert, last writer
/// wins); a reader never observes a partially written entry. Expired rows
/// are deleted lazily, on the read that observes them expired.
#[derive(Clone)]
pub struct CacheStore {
    pool: SqlitePool,
}

impl CacheStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Write `value` under `key`, expiring `ttl` from now.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let data = serde_json::to_value(value).map_err(|e| Error::Decode(e.to_string()))?;
        self.set_value(key, &data, ttl).await
    }

    pub(crate) async fn set_value(&self, key: &str, data: &Value, ttl: Duration) -> Result<()> {
        let fetched_at = Utc::now().timestamp_millis();
        let expiry = fetched_at + ttl.as_millis() as i64;
        let entry = serde_json::to_string(&StoredEntry {
            data: data.clone(),
            expiry,
        })
        .map_err(|e| Error::Decode(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO cache_entries (key, entry, fetched_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                entry = excluded.entry,
                fetched_at = excluded.fetched_at
            "#,
        )
        .bind(key)
        .bind(entry)
        .bind(fetched_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    /// Read `key`. Absent once `now > expiry`; the expired row is deleted on
    /// that observation so later reads are consistently absent. Rows that no
    /// longer decode are treated the same way.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<CacheEntry<T>>> {
        let row = sqlx::query("SELECT entry, fetched_at FROM cache_entries WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let raw: String = row.try_get("entry").map_err(store_err)?;
        let fetched_at: i64 = row.try_get("fetched_at").map_err(store_err)?;

        let stored: StoredEntry = match serde_json::from_str(&raw) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(key, error = %e, "evicting undecodable cache entry");
                self.remove(key).await?;
                return Ok(None);
            }
        };

        if Utc::now().timestamp_millis() > stored.expiry {
            self.remove(key).await?;
            return Ok(None);
        }

        let value: T = match serde_json::from_value(stored.data) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "evicting cache entry with unexpected shape");
                self.remove(key).await?;
                return Ok(None);
            }
        };

        Ok(Some(CacheEntry {
            value,
            fetched_at,
            expires_at: stored.expiry,
        }))
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM cache_entries WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }
}

fn store_err(e: sqlx::Error) -> Error {
    Error::Store(e.to_string())
}
