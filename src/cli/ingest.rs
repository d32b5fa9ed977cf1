// src/cli/ingest.rs — Memory commands: ingest files, search context

use std::path::PathBuf;

use crate::memory::{Metadata, Retriever, SqliteRetriever};

/// Store each file as separate units. Unreadable files are reported and skipped.
pub async fn run_ingest(retriever: &SqliteRetriever, files: &[PathBuf]) -> anyhow::Result<()> {
    let mut total = 0;
    for file in files {
        let code = match tokio::fs::read_to_string(file).await {
            Ok(c) => c,
            Err(e) => {
                eprintln!("  skip {}: {}", file.display(), e);
                continue;
            }
        };
        let mut metadata = Metadata::new();
        metadata.insert(
            "filename".into(),
            file.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string()),
        );
        metadata.insert("path".into(), file.display().to_string());

        let stored = retriever.add_code_artifact(&code, &metadata).await?;
        println!("{}: {} new unit(s)", file.display(), stored);
        total += stored;
    }

    let count = {
        let store = retriever.store();
        let guard = store
            .lock()
            .map_err(|_| anyhow::anyhow!("artifact store lock poisoned"))?;
        guard.count_artifacts()?
    };
    println!("Stored {} new unit(s); {} in memory", total, count);
    Ok(())
}

/// Print the context blob a task with this text would receive.
pub async fn run_search(retriever: &SqliteRetriever, query: &str, k: usize) -> anyhow::Result<()> {
    let context = retriever.retrieve_relevant(query, k).await;
    if context.is_empty() {
        eprintln!("Memory is empty.");
    } else {
        println!("{}", context);
    }
    Ok(())
}

/// Remove every unit stored from `source`. Returns the number removed.
pub fn run_forget(retriever: &SqliteRetriever, source: &str) -> anyhow::Result<usize> {
    let store = retriever.store();
    let guard = store
        .lock()
        .map_err(|_| anyhow::anyhow!("artifact store lock poisoned"))?;

    let units = guard.query_artifacts_by_source(source)?;
    if units.is_empty() {
        eprintln!("Nothing stored from {}", source);
        return Ok(0);
    }
    for unit in &units {
        println!("  forget {}::{} ({})", source, unit.name, unit.kind);
    }
    let removed = guard.delete_by_source(source)?;
    println!("Removed {} unit(s) from {}", removed, source);
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryManager;

    fn meta(source: &str) -> Metadata {
        let mut m = Metadata::new();
        m.insert("source".into(), source.into());
        m
    }

    #[tokio::test]
    async fn test_forget_removes_only_that_source() {
        let retriever = MemoryManager::in_memory().unwrap().into_retriever();
        retriever
            .add_code_artifact("def a():\n    pass\n\ndef b():\n    pass\n", &meta("a.py"))
            .await
            .unwrap();
        retriever
            .add_code_artifact("def c():\n    pass\n", &meta("c.py"))
            .await
            .unwrap();

        assert_eq!(run_forget(&retriever, "a.py").unwrap(), 2);
        assert_eq!(run_forget(&retriever, "a.py").unwrap(), 0);

        let context = retriever.retrieve_relevant("anything", 5).await;
        assert_eq!(context, "# c.py::c\ndef c():\n    pass");
    }
}
