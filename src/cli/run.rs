// src/cli/run.rs — Default command: run a task

use std::sync::Arc;

use crate::core::orchestrator::Orchestrator;
use crate::core::types::AgentConfig;
use crate::evaluator::static_analysis::PythonStaticAnalyzer;
use crate::infra::config::Config;
use crate::memory::{Metadata, Retriever, SqliteRetriever};
use crate::provider::resolver;
use crate::provider::{ModelRef, ProviderGenerator};

/// Options the CLI layer collects for a run.
pub struct RunOptions {
    pub model: Option<String>,
    pub retries: Option<u32>,
    pub quiet: bool,
    pub remember: bool,
}

/// Execute a task through the retry loop. Returns whether the code verified.
pub async fn run_task(
    task_description: &str,
    retriever: SqliteRetriever,
    config: &Config,
    opts: &RunOptions,
) -> anyhow::Result<bool> {
    let model_str = opts.model.as_deref().unwrap_or(&config.model.default);
    let model_ref = ModelRef::parse(model_str).ok_or_else(|| {
        anyhow::anyhow!("Invalid model '{}': expected provider/model", model_str)
    })?;
    let provider = resolver::build_provider(&model_ref, &config.model)?;
    let generator = ProviderGenerator::new(provider, model_ref.model.clone())
        .with_temperature(config.model.temperature)
        .with_max_tokens(config.model.max_tokens);

    let agent_config = agent_config(config)?;
    let max_retries = opts.retries.unwrap_or(config.agent.max_retries);
    let retriever = Arc::new(retriever);

    let mut orchestrator = Orchestrator::new(
        Arc::new(generator),
        retriever.clone(),
        Arc::new(PythonStaticAnalyzer::from_config(&config.verifier)),
        agent_config,
    );
    if !opts.quiet {
        orchestrator = orchestrator.with_progress(super::progress::terminal_progress());
        eprintln!(
            "[execute] {} | model: {}",
            crate::util::truncate_str(task_description, 60),
            model_ref,
        );
    }

    let result = orchestrator.run(task_description, max_retries).await?;

    // Display result
    println!("{}", result);

    if result.is_verified() && opts.remember {
        let mut metadata = Metadata::new();
        metadata.insert("source".into(), "generated".into());
        metadata.insert("model".into(), model_ref.to_string());
        metadata.insert("task".into(), task_description.to_string());
        let stored = retriever.add_code_artifact(&result.code, &metadata).await?;
        if !opts.quiet {
            eprintln!("  {} unit(s) remembered", stored);
        }
    }

    Ok(result.is_verified())
}

/// Orchestrator settings from the `[agent]` config section.
pub fn agent_config(config: &Config) -> anyhow::Result<AgentConfig> {
    let prompt_template = match config.agent.prompt_template {
        Some(ref path) => Some(std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Cannot read prompt template {}: {}", path.display(), e)
        })?),
        None => None,
    };
    Ok(AgentConfig {
        retrieval_k: config.agent.retrieval_k,
        prompt_strategy: config.agent.prompt_strategy,
        stop: config.agent.stop.clone(),
        prompt_template,
    })
}
