//! # Decompose Skill
//!
//! Breaks a research topic into an ordered list of sub-questions.
//! This is the first phase of every research run.

use crate::models::ModelConfig;
use crate::run_llm_function;
use radkit::macros::LLMOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Output from the decompose skill
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct SubQuestions {
    /// Ordered research sub-questions
    pub questions: Vec<String>,
}

impl SubQuestions {
    /// Trim whitespace and drop blank entries, preserving order
    pub fn normalized(self) -> Vec<String> {
        self.questions
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect()
    }
}

/// Decomposer skill for splitting a topic into sub-questions
pub struct DecomposeSkill;

impl DecomposeSkill {
    /// Build the user prompt for a topic
    pub fn prompt(topic: &str, question_count: usize) -> String {
        format!(
            "Research topic: {}\n\nGenerate exactly {} distinct sub-questions that together \
             cover this topic in depth.",
            topic.trim(),
            question_count
        )
    }

    /// Call the LLM and return the normalized question list
    pub async fn run(
        topic: &str,
        question_count: usize,
        config: &ModelConfig,
    ) -> anyhow::Result<Vec<String>> {
        let prompt = Self::prompt(topic, question_count);
        let output = run_llm_function!(config, SubQuestions, SYSTEM_PROMPT, prompt)?;
        Ok(output.normalized())
    }
}

const SYSTEM_PROMPT: &str = super::prompts::DECOMPOSER;
