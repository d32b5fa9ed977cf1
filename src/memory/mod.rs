// src/memory/mod.rs — Code memory: storage + retrieval

pub mod chunker;
pub mod retriever;
pub mod schema;
pub mod similarity;
pub mod store;

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use rusqlite::Connection;

use crate::infra::errors::CodeCraftError;

pub use retriever::SqliteRetriever;

/// Free-form key/value tags stored with an artifact (e.g. `source`).
pub type Metadata = BTreeMap<String, String>;

/// Supplies relevant stored code for a task and accepts new code.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Context text for `query`, at most `k` units. Never fails; an empty
    /// string means nothing is available.
    async fn retrieve_relevant(&self, query: &str, k: usize) -> String;

    /// Store `code` for later retrieval. Returns the number of new units.
    async fn add_code_artifact(
        &self,
        code: &str,
        metadata: &Metadata,
    ) -> Result<usize, CodeCraftError>;
}

/// Owns the SQLite connection.
pub struct MemoryManager {
    pub store: store::Store,
}

impl MemoryManager {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        schema::run_migrations(&conn)?;
        Ok(Self {
            store: store::Store::new(conn),
        })
    }

    pub fn in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::run_migrations(&conn)?;
        Ok(Self {
            store: store::Store::new(conn),
        })
    }

    pub fn into_retriever(self) -> SqliteRetriever {
        SqliteRetriever::from_store(self.store)
    }
}
