// src/core/extractor.rs — Isolate the code artifact inside raw model output
//
// Priority order:
//   1. Fenced blocks (```lang ... ```), longest wins, first on ties.
//   2. Line scan from the first Python-looking line to the first sign-off line.
//   3. The trimmed input, verbatim.
//
// The heuristic is deliberately fixed: downstream prompts and verifiers are
// tuned against it.

use std::sync::LazyLock;

use regex::Regex;

/// Fenced block. The optional language tag must end its line, so an inline
/// block like ```def f(): pass``` keeps its first word. A bare `python` tag is
/// also stripped when code follows it on the same line.
static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:[\w+#.-]+[ \t]*\r?\n|python)?\s*(.*?)```")
        .expect("fence pattern is valid")
});

/// Trimmed, case-sensitive prefixes that start a line-scan capture.
const START_TRIGGERS: &[&str] = &["def ", "class ", "import ", "from ", "@"];

/// Trimmed, lower-cased prefixes that end a line-scan capture.
const STOP_PHRASES: &[&str] = &["note:", "hope this helps", "explanation:"];

/// Extract the best-effort code string from model output. Never fails; may
/// return an empty string (empty input) or the trimmed input itself when no
/// code could be located.
pub fn extract_code(text: &str) -> String {
    let text = text.trim();

    if let Some(block) = longest_fenced_block(text) {
        return block.trim().to_string();
    }

    if let Some(code) = scan_code_lines(text) {
        return code;
    }

    text.to_string()
}

/// All fenced block bodies in document order.
pub fn fenced_blocks(text: &str) -> Vec<&str> {
    FENCE_RE
        .captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

/// Longest fenced body by character count; the earliest one wins a tie.
fn longest_fenced_block(text: &str) -> Option<&str> {
    let mut best: Option<(&str, usize)> = None;
    for block in fenced_blocks(text) {
        let len = block.chars().count();
        match best {
            Some((_, best_len)) if len <= best_len => {}
            _ => best = Some((block, len)),
        }
    }
    best.map(|(block, _)| block)
}

/// Capture lines from the first start trigger up to (not including) the first
/// stop phrase. `None` when no line triggered.
fn scan_code_lines(text: &str) -> Option<String> {
    let mut captured: Vec<&str> = Vec::new();
    let mut started = false;

    for line in text.split('\n') {
        let trimmed = line.trim();
        if !started {
            if START_TRIGGERS.iter().any(|t| trimmed.starts_with(t)) {
                started = true;
                captured.push(line);
            }
            continue;
        }

        let lowered = trimmed.to_lowercase();
        if STOP_PHRASES.iter().any(|p| lowered.starts_with(p)) {
            break;
        }
        captured.push(line);
    }

    if captured.is_empty() {
        None
    } else {
        Some(captured.join("\n").trim().to_string())
    }
}
