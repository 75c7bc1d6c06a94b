//! # Research Skill
//!
//! Answers a single research sub-question. Called once per question,
//! strictly one at a time, by the research controller.

use crate::models::ModelConfig;
use crate::run_llm_function;
use radkit::macros::LLMOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Output from the research skill
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct ResearchFindings {
    /// Markdown answer to the question
    pub answer: String,
}

/// Researcher skill for answering one sub-question
pub struct ResearchSkill;

impl ResearchSkill {
    pub fn prompt(question: &str) -> String {
        format!("Research question: {}", question.trim())
    }

    /// Call the LLM and return the answer text as produced.
    ///
    /// Empty answers are passed through unchanged.
    pub async fn run(question: &str, config: &ModelConfig) -> anyhow::Result<String> {
        let prompt = Self::prompt(question);
        let output = run_llm_function!(config, ResearchFindings, SYSTEM_PROMPT, prompt)?;
        Ok(output.answer)
    }
}

const SYSTEM_PROMPT: &str = super::prompts::RESEARCHER;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt() {
        assert_eq!(
            ResearchSkill::prompt(" Why now? "),
            "Research question: Why now?"
        );
    }
}
