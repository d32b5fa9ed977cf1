// src/cli/mod.rs — CLI definition (clap derive)

pub mod check;
pub mod ingest;
pub mod progress;
pub mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::infra::config::Config;
use crate::memory::{MemoryManager, SqliteRetriever};

#[derive(Parser)]
#[command(
    name = "codecraft",
    about = "Generate verified Python code with retries",
    version
)]
pub struct Cli {
    /// Task to run (default command when no subcommand given)
    #[arg(trailing_var_arg = true)]
    pub task: Vec<String>,

    /// Model to use (provider/model format)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Maximum generation attempts (defaults to agent.max_retries)
    #[arg(short, long)]
    pub retries: Option<u32>,

    /// Suppress progress output (only emit final result)
    #[arg(long)]
    pub quiet: bool,

    /// Read task from stdin
    #[arg(long)]
    pub stdin: bool,

    /// Store verified code back into memory
    #[arg(long)]
    pub remember: bool,

    /// Use a throwaway in-memory store
    #[arg(long)]
    pub ephemeral: bool,

    /// Config file path
    #[arg(long)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store Python files in memory, one unit per top-level definition
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the context memory would supply for a query
    Search {
        query: Vec<String>,
        /// Number of units to return
        #[arg(short, default_value = "3")]
        k: usize,
    },
    /// Remove every stored unit that came from a source (e.g. a filename)
    Forget { source: String },
    /// Run the verifier on a file
    Check { file: PathBuf },
}

/// Open the configured artifact store, or an in-memory one.
pub fn open_retriever(config: &Config, ephemeral: bool) -> anyhow::Result<SqliteRetriever> {
    let manager = if ephemeral {
        MemoryManager::in_memory()?
    } else {
        let path = config.memory.resolved_db_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        tracing::debug!("Opening artifact store at {}", path.display());
        MemoryManager::open(&path)?
    };
    Ok(manager.into_retriever())
}
