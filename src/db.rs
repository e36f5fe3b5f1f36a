use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::{Result, ScrapeError};

pub const RENTS: &str = "rents";
pub const UNITS: &str = "units";
pub const FLOORPLANS: &str = "floorplans";

pub const COLLECTIONS: [&str; 3] = [RENTS, UNITS, FLOORPLANS];

/// Keyed JSON documents grouped into named collections, stored in SQLite.
///
/// Writes are merge-upserts: new top-level fields overwrite, fields absent
/// from the new document are kept.
#[derive(Clone)]
pub struct DocumentStore {
    conn: Arc<Mutex<Connection>>,
}

impl DocumentStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| ScrapeError::Write(format!("cannot create {:?}: {}", dir, e)))?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(Self::wrap(conn))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::wrap(Connection::open_in_memory()?))
    }

    fn wrap(conn: Connection) -> Self {
        DocumentStore {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ScrapeError::Write("document store lock poisoned".into()))
    }

    pub fn init_schema(&self) -> Result<()> {
        self.lock()?.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id         TEXT NOT NULL,
                data       TEXT NOT NULL CHECK(json_valid(data)),
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (collection, id)
            );
            ",
        )?;
        Ok(())
    }

    /// Create the document, or merge `doc`'s fields over the stored one.
    pub fn merge(&self, collection: &str, id: &str, doc: &Value) -> Result<()> {
        let data = serde_json::to_string(doc)
            .map_err(|e| ScrapeError::Write(format!("{}/{}: {}", collection, id, e)))?;
        self.lock()?.execute(
            "INSERT INTO documents (collection, id, data)
             VALUES (?1, ?2, json(?3))
             ON CONFLICT(collection, id) DO UPDATE SET
                data = json_patch(documents.data, excluded.data),
                updated_at = datetime('now')",
            rusqlite::params![collection, id, data],
        )?;
        Ok(())
    }

    /// Merge every record into `collection` under `key_fn(record)`.
    ///
    /// Writes run concurrently with no ordering between them and no
    /// transaction: a failed write leaves the others in place. Waits for all
    /// writes, then reports the first failure seen.
    pub async fn write_batch<T, F>(&self, collection: &str, records: &[T], key_fn: F) -> Result<usize>
    where
        T: Serialize,
        F: Fn(&T) -> String,
    {
        let mut writes = JoinSet::new();
        for record in records {
            let key = key_fn(record);
            let doc = serde_json::to_value(record)
                .map_err(|e| ScrapeError::Write(format!("{}/{}: {}", collection, key, e)))?;
            let store = self.clone();
            let collection = collection.to_string();
            writes.spawn_blocking(move || store.merge(&collection, &key, &doc));
        }

        let mut written = 0usize;
        let mut first_error = None;
        while let Some(joined) = writes.join_next().await {
            let outcome = joined
                .map_err(|e| ScrapeError::Write(format!("write task failed: {}", e)))
                .and_then(|r| r);
            match outcome {
                Ok(()) => written += 1,
                Err(e) if first_error.is_none() => first_error = Some(e),
                Err(e) => warn!("Additional write failure in {}: {}", collection, e),
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                debug!("Merged {} documents into {}", written, collection);
                Ok(written)
            }
        }
    }

    pub fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let data: Option<String> = self
            .lock()?
            .query_row(
                "SELECT data FROM documents WHERE collection = ?1 AND id = ?2",
                rusqlite::params![collection, id],
                |row| row.get(0),
            )
            .optional()?;
        data.map(|s| {
            serde_json::from_str(&s)
                .map_err(|e| ScrapeError::Write(format!("corrupt document {}/{}: {}", collection, id, e)))
        })
        .transpose()
    }

    pub fn count(&self, collection: &str) -> Result<usize> {
        let n: usize = self.lock()?.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            [collection],
            |r| r.get(0),
        )?;
        Ok(n)
    }
}
