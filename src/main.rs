// src/main.rs — codecraft entry point

use clap::Parser;

use codecraft::cli::run::RunOptions;
use codecraft::cli::{Cli, Commands};
use codecraft::infra::config::Config;
use codecraft::infra::logger;

/// Exit status when every attempt was rejected.
const EXIT_EXHAUSTED: i32 = 2;

#[tokio::main]
async fn main() {
    // Initialize logging (respects RUST_LOG / CODECRAFT_LOG)
    logger::init_logging("warn");

    match run().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(EXIT_EXHAUSTED),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when the command ran but produced no accepted code.
async fn run() -> anyhow::Result<bool> {
    let cli = Cli::parse();

    // Load config (falls back to defaults if no config.toml)
    let config = if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))?
    } else {
        Config::load()?
    };

    match &cli.command {
        Some(Commands::Check { file }) => {
            return codecraft::cli::check::run_check(file, &config.verifier).await;
        }
        Some(Commands::Ingest { files }) => {
            let retriever = codecraft::cli::open_retriever(&config, cli.ephemeral)?;
            codecraft::cli::ingest::run_ingest(&retriever, files).await?;
            return Ok(true);
        }
        Some(Commands::Search { query, k }) => {
            let retriever = codecraft::cli::open_retriever(&config, cli.ephemeral)?;
            codecraft::cli::ingest::run_search(&retriever, &query.join(" "), *k).await?;
            return Ok(true);
        }
        Some(Commands::Forget { source }) => {
            let retriever = codecraft::cli::open_retriever(&config, cli.ephemeral)?;
            codecraft::cli::ingest::run_forget(&retriever, source)?;
            return Ok(true);
        }
        None => {}
    }

    let task = build_task_input(&cli)?;
    let retriever = codecraft::cli::open_retriever(&config, cli.ephemeral)?;
    let opts = RunOptions {
        model: cli.model.clone(),
        retries: cli.retries,
        quiet: cli.quiet,
        remember: cli.remember,
    };
    codecraft::cli::run::run_task(&task, retriever, &config, &opts).await
}

/// Build the task description from CLI args and/or stdin.
///
/// With `--stdin`, stdin is the task; positional args, if any, are
/// prepended as the instruction.
fn build_task_input(cli: &Cli) -> anyhow::Result<String> {
    let has_args = !cli.task.is_empty();

    if cli.stdin {
        let content = read_stdin()?;
        if has_args {
            Ok(format!("{}\n\n{}", cli.task.join(" "), content))
        } else {
            Ok(content)
        }
    } else if has_args {
        Ok(cli.task.join(" "))
    } else {
        anyhow::bail!("No task provided. Usage: codecraft <task> or codecraft --stdin")
    }
}

fn read_stdin() -> anyhow::Result<String> {
    use std::io::Read;
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    if buf.trim().is_empty() {
        anyhow::bail!("No input received on stdin");
    }
    Ok(buf)
}
