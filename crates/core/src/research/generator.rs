//! # Text Generator
//!
//! The collaborator the controller calls for each phase. The controller
//! only sees the trait; `LlmGenerator` backs it with the LLM skills.

use async_trait::async_trait;

use super::context::ResearchItem;
use super::error::GenerationError;
use crate::models::ModelConfig;
use crate::skills::{DecomposeSkill, ResearchSkill, SynthesisSkill};

/// Default number of sub-questions requested per topic
pub const DEFAULT_QUESTION_COUNT: usize = 4;

/// Text generation backend for the three research phases
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Split a topic into ordered sub-questions
    async fn decompose(&self, topic: &str) -> anyhow::Result<Vec<String>>;

    /// Answer a single sub-question
    async fn research(&self, question: &str) -> anyhow::Result<String>;

    /// Compile answered questions, in order, into a report
    async fn synthesize(&self, topic: &str, findings: &[ResearchItem])
        -> anyhow::Result<String>;
}

/// LLM-backed generator, one model config per role
#[derive(Debug, Clone)]
pub struct LlmGenerator {
    decomposer: ModelConfig,
    researcher: ModelConfig,
    synthesizer: ModelConfig,
    question_count: usize,
}

impl LlmGenerator {
    pub fn new(
        decomposer: ModelConfig,
        researcher: ModelConfig,
        synthesizer: ModelConfig,
    ) -> Self {
        Self {
            decomposer,
            researcher,
            synthesizer,
            question_count: DEFAULT_QUESTION_COUNT,
        }
    }

    pub fn with_question_count(mut self, count: usize) -> Self {
        self.question_count = count.max(1);
        self
    }
}

#[async_trait]
impl TextGenerator for LlmGenerator {
    async fn decompose(&self, topic: &str) -> anyhow::Result<Vec<String>> {
        tracing::debug!(model = %self.decomposer.model, "Requesting sub-questions");
        let questions = DecomposeSkill::run(topic, self.question_count, &self.decomposer).await?;
        if questions.is_empty() {
            return Err(GenerationError::InvalidResponse {
                message: "decomposer returned no questions".to_string(),
            }
            .into());
        }
        Ok(questions)
    }

    async fn research(&self, question: &str) -> anyhow::Result<String> {
        ResearchSkill::run(question, &self.researcher).await
    }

    async fn synthesize(
        &self,
        topic: &str,
        findings: &[ResearchItem],
    ) -> anyhow::Result<String> {
        tracing::debug!(
            model = %self.synthesizer.model,
            findings = findings.len(),
            "Requesting report synthesis"
        );
        SynthesisSkill::run(topic, findings, &self.synthesizer).await
    }
}
