// src/memory/chunker.rs — Split Python source into top-level units
//
// Each top-level `def`/`async def`/`class` becomes its own unit, with any
// decorators directly above it attached. Everything else at column 0
// (imports, constants, module comments) is gathered into one "module" unit.
// Indented and blank lines belong to whatever unit is open.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Function,
    Class,
    Module,
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkKind::Function => "function",
            ChunkKind::Class => "class",
            ChunkKind::Module => "module",
        }
    }
}

impl std::fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeChunk {
    pub name: String,
    pub kind: ChunkKind,
    pub code: String,
}

/// Name given to the module-level unit.
pub const MODULE_CHUNK_NAME: &str = "<module>";

/// Split `source` into definition units followed by the module unit (if any).
/// Source with no top-level definitions yields a single module unit.
pub fn chunk_python(source: &str) -> Vec<CodeChunk> {
    let mut chunks: Vec<CodeChunk> = Vec::new();
    let mut module_lines: Vec<&str> = Vec::new();
    let mut pending_decorators: Vec<&str> = Vec::new();
    let mut current: Option<(String, ChunkKind, Vec<&str>)> = None;

    for line in source.lines() {
        let is_top_level = !line.is_empty() && !line.starts_with(char::is_whitespace);

        if !is_top_level {
            match current.as_mut() {
                Some((_, _, lines)) => lines.push(line),
                None if pending_decorators.is_empty() => module_lines.push(line),
                None => pending_decorators.push(line),
            }
            continue;
        }

        if line.starts_with('@') {
            close(&mut current, &mut chunks);
            pending_decorators.push(line);
            continue;
        }

        if let Some((name, kind)) = definition_header(line) {
            close(&mut current, &mut chunks);
            let mut lines = std::mem::take(&mut pending_decorators);
            lines.push(line);
            current = Some((name, kind, lines));
            continue;
        }

        // Any other column-0 statement ends the open definition.
        close(&mut current, &mut chunks);
        module_lines.append(&mut pending_decorators);
        module_lines.push(line);
    }

    close(&mut current, &mut chunks);
    module_lines.append(&mut pending_decorators);

    let module_code = module_lines.join("\n").trim().to_string();
    if !module_code.is_empty() {
        chunks.push(CodeChunk {
            name: MODULE_CHUNK_NAME.into(),
            kind: ChunkKind::Module,
            code: module_code,
        });
    }

    chunks
}

fn close(current: &mut Option<(String, ChunkKind, Vec<&str>)>, chunks: &mut Vec<CodeChunk>) {
    if let Some((name, kind, lines)) = current.take() {
        chunks.push(CodeChunk {
            name,
            kind,
            code: lines.join("\n").trim_end().to_string(),
        });
    }
}

/// Name and kind for `def name(`, `async def name(` or `class Name:` lines.
fn definition_header(line: &str) -> Option<(String, ChunkKind)> {
    let (rest, kind) = if let Some(rest) = line.strip_prefix("def ") {
        (rest, ChunkKind::Function)
    } else if let Some(rest) = line.strip_prefix("async def ") {
        (rest, ChunkKind::Function)
    } else if let Some(rest) = line.strip_prefix("class ") {
        (rest, ChunkKind::Class)
    } else {
        return None;
    };

    let name: String = rest
        .trim_start()
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    if name.is_empty() {
        None
    } else {
        Some((name, kind))
    }
}
