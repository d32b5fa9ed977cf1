// src/cli/progress.rs — Terminal progress renderer

use crate::core::types::ProgressEvent;
use crate::util::truncate_str;

/// One stderr line for `event`.
pub fn format_event(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::ContextRetrieved { chars } => {
            if *chars == 0 {
                "[recall] no stored code matched".to_string()
            } else {
                format!("[recall] {} chars of context", chars)
            }
        }
        ProgressEvent::AttemptStart {
            attempt,
            max_attempts,
        } => format!("[attempt {}/{}] generating...", attempt, max_attempts),
        ProgressEvent::Extracted { attempt, preview } => {
            let mut lines = preview.lines();
            let mut out = format!(
                "[attempt {}]   code: {}",
                attempt,
                truncate_str(lines.next().unwrap_or_default(), 60)
            );
            for line in lines {
                out.push_str("\n                    ");
                out.push_str(truncate_str(line, 60));
            }
            out
        }
        ProgressEvent::ExtractionEmpty { attempt } => {
            format!("[attempt {}]   no code in response", attempt)
        }
        ProgressEvent::Verified { attempt, score } => match score {
            Some(s) => format!("[attempt {}] verified score={:.1}", attempt, s),
            None => format!("[attempt {}] verified", attempt),
        },
        ProgressEvent::Rejected { attempt, errors } => {
            let first = errors.lines().next().unwrap_or_default();
            format!("[attempt {}] rejected: {}", attempt, truncate_str(first, 80))
        }
        ProgressEvent::Exhausted { attempts } => {
            format!("[done] no verified code after {} attempt(s)", attempts)
        }
    }
}

/// Build a progress callback that writes formatted output to stderr.
///
/// All progress output goes to stderr so stdout remains clean for the code.
/// Returns a closure suitable for `Orchestrator::with_progress()`.
pub fn terminal_progress() -> impl Fn(ProgressEvent) + Send + Sync + 'static {
    move |event| eprintln!("{}", format_event(&event))
}
