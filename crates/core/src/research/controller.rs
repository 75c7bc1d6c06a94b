//! # Research Controller
//!
//! Drives a topic through decomposition, paced research, and report
//! synthesis, and owns the authoritative [`RunContext`].
//!
//! Every result is applied through a staleness guard: a mutation only lands
//! if the run it belongs to is still the current one. A `reset` or a new
//! `start` therefore silently orphans in-flight calls of the previous run
//! without cancelling them.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::context::{Phase, ResearchItem, RunContext};
use super::error::{FailureReason, PipelineError};
use super::events::{ResearchEvent, ResearchEventKind};
use super::generator::{LlmGenerator, TextGenerator, DEFAULT_QUESTION_COUNT};
use super::progress::{ProgressSnapshot, PREVIEW_CHARS};
use crate::models::{LlmProvider, ModelConfig};

/// Role id of the decomposer model
pub const DECOMPOSER: &str = "decomposer";
/// Role id of the researcher model
pub const RESEARCHER: &str = "researcher";
/// Role id of the synthesizer model
pub const SYNTHESIZER: &str = "synthesizer";

/// Configuration for the research controller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Global LLM provider (default: Gemini)
    pub global_provider: LlmProvider,
    /// Global model to use for every role
    pub global_model: Option<String>,
    /// Base URL override for LLM API (for OpenAI-compatible endpoints)
    pub base_url: Option<String>,
    /// Per-role model overrides (role id -> model name)
    pub per_agent_models: HashMap<String, String>,
    /// Wait inserted between consecutive research calls
    pub pacing_delay_ms: u64,
    /// Sub-questions requested from the decomposer
    pub question_count: usize,
    /// Characters kept in answer previews
    pub preview_chars: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            global_provider: LlmProvider::Gemini,
            global_model: None,
            base_url: None,
            per_agent_models: HashMap::new(),
            pacing_delay_ms: 500,
            question_count: DEFAULT_QUESTION_COUNT,
            preview_chars: PREVIEW_CHARS,
        }
    }
}

impl ResearchConfig {
    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }

    /// Get model config for a role: per-role override -> global -> provider default
    pub fn model_config(&self, role: &str) -> ModelConfig {
        let provider = self.global_provider.clone();
        let model = self
            .per_agent_models
            .get(role)
            .or(self.global_model.as_ref())
            .cloned()
            .unwrap_or_else(|| provider.default_model().to_string());

        let base_url = if provider.supports_base_url() {
            self.base_url.clone()
        } else {
            None
        };

        ModelConfig {
            provider,
            model,
            base_url,
        }
    }

    /// Build the LLM-backed generator described by this config
    pub fn llm_generator(&self) -> LlmGenerator {
        LlmGenerator::new(
            self.model_config(DECOMPOSER),
            self.model_config(RESEARCHER),
            self.model_config(SYNTHESIZER),
        )
        .with_question_count(self.question_count)
    }
}

/// How a run ended, as seen by the task that drove it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Complete { report: String },
    Failed(FailureReason),
    /// The run was reset or replaced before it finished; its results were discarded
    Superseded,
}

/// Handle to a run spawned by [`ResearchController::start`]
#[derive(Debug)]
pub struct RunHandle {
    pub run_id: Uuid,
    task: JoinHandle<RunOutcome>,
}

impl RunHandle {
    /// Wait for the driving task to finish
    pub async fn join(self) -> anyhow::Result<RunOutcome> {
        Ok(self.task.await?)
    }
}

/// The research controller
#[derive(Clone)]
pub struct ResearchController {
    config: Arc<ResearchConfig>,
    generator: Arc<dyn TextGenerator>,
    context: Arc<RwLock<RunContext>>,
    progress_tx: Arc<watch::Sender<ProgressSnapshot>>,
    event_tx: Option<mpsc::Sender<ResearchEvent>>,
}

impl ResearchController {
    pub fn new(config: ResearchConfig, generator: Arc<dyn TextGenerator>) -> Self {
        let initial = ProgressSnapshot::project(&RunContext::default(), config.preview_chars);
        let (progress_tx, _) = watch::channel(initial);
        Self {
            config: Arc::new(config),
            generator,
            context: Arc::new(RwLock::new(RunContext::default())),
            progress_tx: Arc::new(progress_tx),
            event_tx: None,
        }
    }

    /// Controller backed by the LLM skills
    pub fn with_llm(config: ResearchConfig) -> Self {
        let generator = Arc::new(config.llm_generator());
        Self::new(config, generator)
    }

    /// Set event channel for streaming lifecycle events
    pub fn with_event_channel(mut self, tx: mpsc::Sender<ResearchEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Subscribe to progress snapshots; a new one is published after every change
    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.progress_tx.subscribe()
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.progress_tx.borrow().clone()
    }

    /// Start a run in the background.
    ///
    /// Rejected while another run is in progress.
    pub async fn start(&self, topic: &str) -> Result<RunHandle, PipelineError> {
        let (run_id, topic) = self.begin(topic).await?;
        let controller = self.clone();
        let task = tokio::spawn(async move { controller.drive(run_id, topic).await });
        Ok(RunHandle { run_id, task })
    }

    /// Start a run and drive it to the end on the current task
    pub async fn run(&self, topic: &str) -> Result<RunOutcome, PipelineError> {
        let (run_id, topic) = self.begin(topic).await?;
        Ok(self.drive(run_id, topic).await)
    }

    /// Return to idle, discarding the current run whatever its state
    pub async fn reset(&self) {
        let mut ctx = self.context.write().await;
        let previous = ctx.run_id;
        ctx.reset();
        self.publish(&ctx);

        tracing::info!(previous_run = ?previous, "Research controller reset");
        self.emit(ResearchEvent::new(ResearchEventKind::RunReset, previous))
            .await;
    }

    async fn begin(&self, topic: &str) -> Result<(Uuid, String), PipelineError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(PipelineError::EmptyTopic);
        }

        let mut ctx = self.context.write().await;
        if !ctx.state.accepts_start() {
            return Err(PipelineError::RunInProgress { state: ctx.state });
        }
        let run_id = ctx.begin(topic);
        self.publish(&ctx);

        tracing::info!(%run_id, "Research run started");
        self.emit(
            ResearchEvent::new(ResearchEventKind::RunStarted, Some(run_id))
                .with_data(serde_json::json!({ "topic": topic })),
        )
        .await;
        self.emit(phase_event(ResearchEventKind::PhaseStarted, run_id, Phase::Decompose))
            .await;

        Ok((run_id, topic.to_string()))
    }

    #[tracing::instrument(skip(self, run_id, topic), fields(run_id = %run_id, topic_preview = %topic.chars().take(50).collect::<String>()))]
    async fn drive(&self, run_id: Uuid, topic: String) -> RunOutcome {
        match self.execute(run_id, &topic).await {
            Ok(outcome) => outcome,
            Err(error) => self.handle_failure(run_id, error).await,
        }
    }

    async fn execute(&self, run_id: Uuid, topic: &str) -> anyhow::Result<RunOutcome> {
        // Stage 1: Decompose
        let questions = self
            .generator
            .decompose(topic)
            .await
            .context("Topic decomposition failed")?;

        let events = vec![
            phase_event(ResearchEventKind::PhaseCompleted, run_id, Phase::Decompose),
            ResearchEvent::new(ResearchEventKind::QuestionsGenerated, Some(run_id))
                .with_data(serde_json::json!({ "questions": questions })),
            phase_event(ResearchEventKind::PhaseStarted, run_id, Phase::Research),
        ];
        if !self
            .apply(run_id, |ctx| ctx.questions_ready(&questions), events)
            .await
        {
            return Ok(RunOutcome::Superseded);
        }
        tracing::info!(questions = questions.len(), "Topic decomposed");

        // Stage 2: Research, strictly one question at a time
        let mut findings = Vec::with_capacity(questions.len());
        for (index, question) in questions.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.pacing_delay()).await;
            }
            if !self.is_current(run_id).await {
                return Ok(RunOutcome::Superseded);
            }

            let answer = self.generator.research(question).await.with_context(|| {
                format!(
                    "Research failed for question {} of {}",
                    index + 1,
                    questions.len()
                )
            })?;

            let event = ResearchEvent::new(ResearchEventKind::AnswerRecorded, Some(run_id))
                .with_item(index);
            let recorded = self
                .apply(
                    run_id,
                    |ctx| {
                        if !ctx.record_answer(index, &answer) {
                            tracing::debug!(index, "Answer already recorded, keeping the first");
                        }
                    },
                    vec![event],
                )
                .await;
            if !recorded {
                return Ok(RunOutcome::Superseded);
            }

            tracing::debug!(index, answer_chars = answer.chars().count(), "Answer recorded");
            findings.push(ResearchItem::answered(question.clone(), answer));
        }

        let events = vec![
            phase_event(ResearchEventKind::PhaseCompleted, run_id, Phase::Research),
            phase_event(ResearchEventKind::PhaseStarted, run_id, Phase::Compile),
        ];
        if !self
            .apply(run_id, RunContext::research_complete, events)
            .await
        {
            return Ok(RunOutcome::Superseded);
        }
        tracing::info!(findings = findings.len(), "Research phase complete");

        // Stage 3: Compile
        let report = self
            .generator
            .synthesize(topic, &findings)
            .await
            .context("Report synthesis failed")?;

        let events = vec![
            phase_event(ResearchEventKind::PhaseCompleted, run_id, Phase::Compile),
            ResearchEvent::new(ResearchEventKind::RunCompleted, Some(run_id)),
        ];
        if !self
            .apply(run_id, |ctx| ctx.complete(report.clone()), events)
            .await
        {
            return Ok(RunOutcome::Superseded);
        }
        tracing::info!(report_chars = report.chars().count(), "Research run complete");

        Ok(RunOutcome::Complete { report })
    }

    /// Classify the error and freeze the run in `Failed`
    async fn handle_failure(&self, run_id: Uuid, error: anyhow::Error) -> RunOutcome {
        let reason = FailureReason::from_error(&error);

        let event = ResearchEvent::new(ResearchEventKind::RunFailed, Some(run_id)).with_data(
            serde_json::json!({ "kind": reason.kind, "message": reason.message }),
        );
        if !self
            .apply(run_id, |ctx| ctx.fail(reason.clone()), vec![event])
            .await
        {
            return RunOutcome::Superseded;
        }

        tracing::warn!(kind = ?reason.kind, error = %reason.detail, "Research run failed");
        RunOutcome::Failed(reason)
    }

    /// Apply `mutate` if `run_id` is still current, publish a snapshot, and
    /// emit `events`.
    ///
    /// The write guard is held until the events are sent, so a concurrent
    /// `reset` cannot slip between a mutation and its events.
    async fn apply<F>(&self, run_id: Uuid, mutate: F, events: Vec<ResearchEvent>) -> bool
    where
        F: FnOnce(&mut RunContext),
    {
        let mut ctx = self.context.write().await;
        if !ctx.is_current(run_id) {
            tracing::debug!(%run_id, "Discarding result for superseded run");
            return false;
        }
        mutate(&mut ctx);
        self.publish(&ctx);
        for event in events {
            self.emit(event).await;
        }
        true
    }

    async fn is_current(&self, run_id: Uuid) -> bool {
        let current = self.context.read().await.is_current(run_id);
        if !current {
            tracing::debug!(%run_id, "Run superseded, stopping");
        }
        current
    }

    fn publish(&self, ctx: &RunContext) {
        self.progress_tx
            .send_replace(ProgressSnapshot::project(ctx, self.config.preview_chars));
    }

    async fn emit(&self, event: ResearchEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event).await;
        }
    }
}

fn phase_event(kind: ResearchEventKind, run_id: Uuid, phase: Phase) -> ResearchEvent {
    ResearchEvent::new(kind, Some(run_id))
        .with_data(serde_json::json!({ "phase": phase, "step": phase.id() }))
}
