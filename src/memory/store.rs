// src/memory/store.rs — SQLite operations

use chrono::Utc;
use rusqlite::{params, Connection};

/// Low-level SQLite operations for stored code artifacts.
pub struct Store {
    conn: Connection,
}

/// One stored code unit.
#[derive(Debug, Clone)]
pub struct ArtifactRow {
    pub id: String,
    pub content_hash: String,
    pub name: String,
    pub kind: String,
    pub source: Option<String>,
    pub code: String,
    /// JSON object.
    pub metadata: String,
    pub created_at: String,
}

impl Store {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    // -- Artifacts --

    /// Insert unless an artifact with the same content hash exists.
    /// Returns whether a row was written.
    pub fn insert_artifact(
        &self,
        content_hash: &str,
        name: &str,
        kind: &str,
        source: Option<&str>,
        code: &str,
        metadata: &str,
    ) -> anyhow::Result<bool> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let written = self.conn.execute(
            "INSERT OR IGNORE INTO artifacts
             (id, content_hash, name, kind, source, code, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![id, content_hash, name, kind, source, code, metadata, now],
        )?;
        Ok(written > 0)
    }

    /// All artifacts, oldest first.
    pub fn query_artifacts(&self) -> anyhow::Result<Vec<ArtifactRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, content_hash, name, kind, source, code, metadata, created_at
             FROM artifacts ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt
            .query_map([], row_to_artifact)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn query_artifacts_by_source(&self, source: &str) -> anyhow::Result<Vec<ArtifactRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, content_hash, name, kind, source, code, metadata, created_at
             FROM artifacts WHERE source = ?1 ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt
            .query_map([source], row_to_artifact)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count_artifacts(&self) -> anyhow::Result<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM artifacts", [], |r| r.get(0))?;
        Ok(n as u64)
    }

    /// Remove everything stored from `source`. Returns rows deleted.
    pub fn delete_by_source(&self, source: &str) -> anyhow::Result<usize> {
        let n = self
            .conn
            .execute("DELETE FROM artifacts WHERE source = ?1", [source])?;
        Ok(n)
    }
}

fn row_to_artifact(row: &rusqlite::Row<'_>) -> rusqlite::Result<ArtifactRow> {
    Ok(ArtifactRow {
        id: row.get(0)?,
        content_hash: row.get(1)?,
        name: row.get(2)?,
        kind: row.get(3)?,
        source: row.get(4)?,
        code: row.get(5)?,
        metadata: row.get(6)?,
        created_at: row.get(7)?,
    })
}
