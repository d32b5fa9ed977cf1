// src/memory/similarity.rs — Lexical relevance between a query and stored code

use std::collections::HashSet;

/// Words too common in code and task text to say anything about relevance.
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "def", "class", "return", "self", "import", "from", "with", "this",
    "that", "none", "true", "false", "pass", "not", "are", "was", "into", "les", "des", "une",
    "dans", "est", "pour",
];

/// Lower-cased terms of `text`. Identifiers are split on `_`, digits and
/// camelCase boundaries, and a trailing plural `s` is dropped, so
/// "calculate_price" and "calculatePrices" both yield {"calculate", "price"}.
pub fn terms(text: &str) -> HashSet<String> {
    let mut out = HashSet::new();
    for word in text.split(|c: char| !c.is_alphanumeric()) {
        for part in split_identifier(word) {
            let lower = part.to_lowercase();
            let stem = lower
                .strip_suffix('s')
                .filter(|s| s.chars().count() >= 3 && !s.ends_with('s'))
                .map(str::to_string)
                .unwrap_or(lower);
            if stem.chars().count() >= 3 && !STOP_WORDS.contains(&stem.as_str()) {
                out.insert(stem);
            }
        }
    }
    out
}

/// "parseHTTPResponse2" -> ["parse", "HTTP", "Response"]
fn split_identifier(word: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let chars: Vec<(usize, char)> = word.char_indices().collect();

    for i in 0..chars.len() {
        let (idx, c) = chars[i];
        if c.is_ascii_digit() {
            if start < idx {
                parts.push(&word[start..idx]);
            }
            start = idx + c.len_utf8();
            continue;
        }
        if i == 0 || idx < start {
            continue;
        }
        let prev = chars[i - 1].1;
        let next_is_lower = chars.get(i + 1).is_some_and(|(_, n)| n.is_lowercase());
        let boundary = c.is_uppercase()
            && (prev.is_lowercase() || (prev.is_uppercase() && next_is_lower));
        if boundary && start < idx {
            parts.push(&word[start..idx]);
            start = idx;
        }
    }
    if start < word.len() {
        parts.push(&word[start..]);
    }
    parts
}

/// Fraction of query terms present in the document, in [0, 1].
/// Asymmetric on purpose: long documents are not penalised for their size.
pub fn query_coverage(query: &HashSet<String>, document: &HashSet<String>) -> f32 {
    if query.is_empty() {
        return 0.0;
    }
    let hits = query.intersection(document).count();
    hits as f32 / query.len() as f32
}
