//! # StarDust Skills
//!
//! Structured LLM calls backing each research phase.
//!
//! - `DecomposeSkill` - Split a topic into sub-questions
//! - `ResearchSkill` - Answer one sub-question
//! - `SynthesisSkill` - Compile findings into the final report

pub mod llm_helpers;
pub mod prompts;

pub mod decompose_skill;
pub mod research_skill;
pub mod synthesis_skill;

pub use decompose_skill::DecomposeSkill;
pub use research_skill::ResearchSkill;
pub use synthesis_skill::SynthesisSkill;
