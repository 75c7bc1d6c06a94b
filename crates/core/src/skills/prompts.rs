//! Default prompt templates bundled at compile time.

/// Decomposer - splits a topic into research sub-questions
pub const DECOMPOSER: &str = include_str!("defaults/decomposer.md");

/// Researcher - answers a single sub-question in depth
pub const RESEARCHER: &str = include_str!("defaults/researcher.md");

/// Synthesizer - compiles answered questions into the final report
pub const SYNTHESIZER: &str = include_str!("defaults/synthesizer.md");
