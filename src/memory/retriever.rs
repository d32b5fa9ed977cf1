// src/memory/retriever.rs — SQLite-backed code retriever

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::chunker::chunk_python;
use super::similarity::{query_coverage, terms};
use super::store::{ArtifactRow, Store};
use super::{Metadata, Retriever};
use crate::infra::errors::CodeCraftError;

/// Added to a unit's score when its name shares a term with the query.
const NAME_BONUS: f32 = 0.25;

/// Label used in context headers for artifacts stored without a source.
const UNKNOWN_SOURCE: &str = "memory";

/// Stores Python artifacts as top-level units and ranks them lexically.
#[derive(Clone)]
pub struct SqliteRetriever {
    store: Arc<Mutex<Store>>,
}

impl SqliteRetriever {
    pub fn new(store: Arc<Mutex<Store>>) -> Self {
        Self { store }
    }

    pub fn from_store(store: Store) -> Self {
        Self::new(Arc::new(Mutex::new(store)))
    }

    pub fn store(&self) -> Arc<Mutex<Store>> {
        Arc::clone(&self.store)
    }

    /// Top `k` rows for `query`, best first. Falls back to the most recent
    /// rows when nothing overlaps.
    pub fn rank(&self, query: &str, k: usize) -> anyhow::Result<Vec<ArtifactRow>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let rows = {
            let store = self
                .store
                .lock()
                .map_err(|_| anyhow::anyhow!("artifact store lock poisoned"))?;
            store.query_artifacts()?
        };

        let query_terms = terms(query);
        // Rows come back oldest first; position doubles as recency.
        let mut scored: Vec<(f32, usize)> = rows
            .iter()
            .enumerate()
            .map(|(pos, row)| (score_row(&query_terms, row), pos))
            .filter(|(score, _)| *score > 0.0)
            .collect();

        let picked: Vec<usize> = if scored.is_empty() {
            (0..rows.len()).rev().take(k).collect()
        } else {
            scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(b.1.cmp(&a.1)));
            scored.into_iter().take(k).map(|(_, pos)| pos).collect()
        };

        let mut rows: Vec<Option<ArtifactRow>> = rows.into_iter().map(Some).collect();
        Ok(picked.into_iter().filter_map(|pos| rows[pos].take()).collect())
    }
}

fn score_row(query_terms: &HashSet<String>, row: &ArtifactRow) -> f32 {
    let document = terms(&format!("{} {}", row.name, row.code));
    let mut score = query_coverage(query_terms, &document);
    if score > 0.0 && !terms(&row.name).is_disjoint(query_terms) {
        score += NAME_BONUS;
    }
    score
}

/// `# <source>::<name>` header followed by the unit's code.
pub fn format_block(row: &ArtifactRow) -> String {
    format!(
        "# {}::{}\n{}",
        row.source.as_deref().unwrap_or(UNKNOWN_SOURCE),
        row.name,
        row.code
    )
}

pub fn content_hash(code: &str) -> String {
    hex::encode(Sha256::digest(code.as_bytes()))
}

fn source_of(metadata: &Metadata) -> Option<&str> {
    ["source", "filename", "path"]
        .iter()
        .find_map(|key| metadata.get(*key))
        .map(String::as_str)
        .filter(|s| !s.is_empty())
}

#[async_trait]
impl Retriever for SqliteRetriever {
    async fn retrieve_relevant(&self, query: &str, k: usize) -> String {
        match self.rank(query, k) {
            Ok(rows) => rows.iter().map(format_block).collect::<Vec<_>>().join("\n\n"),
            Err(e) => {
                tracing::warn!("Context retrieval failed: {}", e);
                String::new()
            }
        }
    }

    async fn add_code_artifact(
        &self,
        code: &str,
        metadata: &Metadata,
    ) -> Result<usize, CodeCraftError> {
        let source = source_of(metadata);
        let metadata_json = serde_json::to_string(metadata)
            .map_err(|e| CodeCraftError::Other(e.into()))?;

        let store = self
            .store
            .lock()
            .map_err(|_| CodeCraftError::Other(anyhow::anyhow!("artifact store lock poisoned")))?;

        let mut stored = 0;
        for chunk in chunk_python(code) {
            let hash = content_hash(&chunk.code);
            let written = store.insert_artifact(
                &hash,
                &chunk.name,
                chunk.kind.as_str(),
                source,
                &chunk.code,
                &metadata_json,
            )?;
            if written {
                stored += 1;
            } else {
                tracing::debug!("Skipping duplicate unit {}", chunk.name);
            }
        }

        tracing::info!(
            "Stored {} new unit(s) from {}",
            stored,
            source.unwrap_or(UNKNOWN_SOURCE)
        );
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryManager;

    fn retriever() -> SqliteRetriever {
        let mm = MemoryManager::in_memory().unwrap();
        SqliteRetriever::from_store(mm.store)
    }

    fn meta(source: &str) -> Metadata {
        let mut m = Metadata::new();
        m.insert("source".into(), source.into());
        m
    }

    #[tokio::test]
    async fn test_empty_store_gives_empty_context() {
        let r = retriever();
        assert_eq!(r.retrieve_relevant("anything at all", 3).await, "");
    }

    #[tokio::test]
    async fn test_zero_k_gives_empty_context() {
        let r = retriever();
        r.add_code_artifact("def price():\n    return 1\n", &meta("a.py"))
            .await
            .unwrap();
        assert_eq!(r.retrieve_relevant("price", 0).await, "");
    }

    #[tokio::test]
    async fn test_block_format() {
        let r = retriever();
        r.add_code_artifact("def price():\n    return 1\n", &meta("a.py"))
            .await
            .unwrap();
        assert_eq!(
            r.retrieve_relevant("price", 3).await,
            "# a.py::price\ndef price():\n    return 1"
        );
    }

    #[tokio::test]
    async fn test_missing_source_label() {
        let r = retriever();
        r.add_code_artifact("def price():\n    return 1\n", &Metadata::new())
            .await
            .unwrap();
        assert!(r
            .retrieve_relevant("price", 1)
            .await
            .starts_with("# memory::price\n"));
    }

    #[tokio::test]
    async fn test_duplicate_units_not_stored_twice() {
        let r = retriever();
        let code = "def a_one():\n    pass\n\ndef b_two():\n    pass\n";
        assert_eq!(r.add_code_artifact(code, &meta("x.py")).await.unwrap(), 2);
        assert_eq!(r.add_code_artifact(code, &meta("x.py")).await.unwrap(), 0);
    }

    #[test]
    fn test_content_hash_is_sha256_hex() {
        let h = content_hash("");
        assert_eq!(
            h,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_source_of_prefers_source_key() {
        let mut m = Metadata::new();
        m.insert("filename".into(), "f.py".into());
        assert_eq!(source_of(&m), Some("f.py"));
        m.insert("source".into(), "s.py".into());
        assert_eq!(source_of(&m), Some("s.py"));
        m.insert("source".into(), String::new());
        assert_eq!(source_of(&m), None);
    }
}
