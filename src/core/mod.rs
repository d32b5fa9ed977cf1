// src/core/mod.rs — Code generation loop

pub mod extractor;
pub mod orchestrator;
pub mod prompt;
pub mod types;
