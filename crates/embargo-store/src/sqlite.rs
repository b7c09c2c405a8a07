//! SQLite-backed [`SecretKeyStore`].
//!
//! The key database survives restarts, so collection keys learned from one
//! user's login stay available to the approval pipeline later. Queries run on
//! tokio's blocking pool behind a shared connection.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use embargo_core::{now_millis, SecretKey};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{check_id, SecretKeyStore};

#[derive(Clone)]
pub struct SqliteKeyStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteKeyStore {
    /// Open (or create) the key database at `path` and migrate it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    /// A private in-memory database, gone when the last clone drops.
    pub fn open_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(mut conn: Connection) -> Result<Self> {
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let joined = tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StoreError::Task("key database lock poisoned".into()))?;
            f(&guard)
        })
        .await;

        joined.map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl SecretKeyStore for SqliteKeyStore {
    async fn load(&self, collection_id: &str) -> Result<Option<SecretKey>> {
        let collection_id = collection_id.to_string();

        self.with_conn(move |conn| {
            let bytes: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT secret_key FROM collection_keys WHERE collection_id = ?1",
                    params![collection_id],
                    |row| row.get(0),
                )
                .optional()?;

            bytes
                .map(|b| {
                    SecretKey::from_slice(&b).map_err(|e| {
                        StoreError::InvalidData(format!(
                            "key for collection {}: {}",
                            collection_id, e
                        ))
                    })
                })
                .transpose()
        })
        .await
    }

    async fn store(&self, collection_id: &str, key: &SecretKey) -> Result<()> {
        check_id(collection_id)?;
        let collection_id = collection_id.to_string();
        let bytes = key.as_bytes().to_vec();

        self.with_conn(move |conn| {
            let now = now_millis();
            conn.execute(
                "INSERT INTO collection_keys (collection_id, secret_key, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)
                 ON CONFLICT(collection_id) DO UPDATE SET
                    secret_key = excluded.secret_key,
                    updated_at = excluded.updated_at",
                params![collection_id, bytes, now],
            )?;
            tracing::debug!(collection_id = %collection_id, "stored collection key");
            Ok(())
        })
        .await
    }

    async fn delete(&self, collection_id: &str) -> Result<bool> {
        let collection_id = collection_id.to_string();

        self.with_conn(move |conn| {
            let removed = conn.execute(
                "DELETE FROM collection_keys WHERE collection_id = ?1",
                params![collection_id],
            )?;
            Ok(removed > 0)
        })
        .await
    }

    async fn list(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT collection_id FROM collection_keys ORDER BY collection_id")?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(ids)
        })
        .await
    }
}
