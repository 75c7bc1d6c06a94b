//! # Synthesis Skill
//!
//! Compiles the answered sub-questions of a run into the final report.

use crate::models::ModelConfig;
use crate::research::ResearchItem;
use crate::run_llm_function;
use radkit::macros::LLMOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Output from the synthesis skill
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct ResearchReport {
    /// Markdown report body
    pub report: String,
}

/// Synthesizer skill for compiling the final report
pub struct SynthesisSkill;

impl SynthesisSkill {
    /// Build the user prompt; findings are listed in question order
    pub fn prompt(topic: &str, findings: &[ResearchItem]) -> String {
        let sections = findings
            .iter()
            .enumerate()
            .map(|(i, item)| {
                format!(
                    "### Question {}: {}\n\n{}\n",
                    i + 1,
                    item.question,
                    item.answer
                )
            })
            .collect::<Vec<String>>()
            .join("\n");

        format!(
            "Topic: {}\n\n## Research Findings\n\n{}",
            topic.trim(),
            sections
        )
    }

    pub async fn run(
        topic: &str,
        findings: &[ResearchItem],
        config: &ModelConfig,
    ) -> anyhow::Result<String> {
        let prompt = Self::prompt(topic, findings);
        let output = run_llm_function!(config, ResearchReport, SYSTEM_PROMPT, prompt)?;
        Ok(output.report)
    }
}

const SYSTEM_PROMPT: &str = super::prompts::SYNTHESIZER;
