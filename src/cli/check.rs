// src/cli/check.rs — Verify a file without generating

use std::path::Path;

use crate::evaluator::static_analysis::PythonStaticAnalyzer;
use crate::evaluator::Verifier;
use crate::infra::config::VerifierConfig;

/// Print the verifier's verdict for `file`. Returns whether it passed.
pub async fn run_check(file: &Path, config: &VerifierConfig) -> anyhow::Result<bool> {
    let code = tokio::fs::read_to_string(file).await?;
    let result = PythonStaticAnalyzer::from_config(config).verify(&code).await;

    let score = result
        .score
        .map(|s| format!(" (score {:.1})", s))
        .unwrap_or_default();
    if result.valid {
        println!("{}: ok{}", file.display(), score);
    } else {
        println!("{}: rejected{}", file.display(), score);
        if let Some(ref errors) = result.errors {
            for line in errors.lines() {
                println!("  {}", line);
            }
        }
    }
    Ok(result.valid)
}
