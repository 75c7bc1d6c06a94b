//! # Run Context
//!
//! The authoritative state of the current research run. Owned by the
//! controller and mutated only through the methods below.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::FailureReason;
use super::pipeline::RunState;

/// One research sub-question and its answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchItem {
    pub question: String,
    /// Empty until the research call for this question resolves
    pub answer: String,
}

impl ResearchItem {
    pub fn pending(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: String::new(),
        }
    }

    pub fn answered(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }

    pub fn is_answered(&self) -> bool {
        !self.answer.is_empty()
    }
}

/// Pipeline phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Decompose,
    Research,
    Compile,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Decompose, Phase::Research, Phase::Compile];

    /// 1-based step id
    pub fn id(&self) -> u8 {
        match self {
            Phase::Decompose => 1,
            Phase::Research => 2,
            Phase::Compile => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Phase::Decompose => "Deconstruct Topic into Sub-Questions",
            Phase::Research => "Conduct Deep Research",
            Phase::Compile => "Synthesize Findings & Compile Report",
        }
    }

    /// Phase that is running while the run is in `state`
    pub fn for_state(state: RunState) -> Option<Phase> {
        match state {
            RunState::Decomposing => Some(Phase::Decompose),
            RunState::Researching => Some(Phase::Research),
            RunState::Compiling => Some(Phase::Compile),
            _ => None,
        }
    }
}

/// Display status of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    #[default]
    Pending,
    Loading,
    Completed,
}

/// One entry of the step list shown alongside a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepStatus {
    pub id: u8,
    pub phase: Phase,
    pub label: String,
    pub status: StepState,
}

impl StepStatus {
    fn pending(phase: Phase) -> Self {
        Self {
            id: phase.id(),
            phase,
            label: phase.label().to_string(),
            status: StepState::Pending,
        }
    }
}

/// All steps in the pending state
pub fn default_steps() -> Vec<StepStatus> {
    Phase::ALL.iter().copied().map(StepStatus::pending).collect()
}

/// State of the current (or last) run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunContext {
    /// Identity of the active run; `None` when idle
    pub run_id: Option<Uuid>,
    pub topic: String,
    pub state: RunState,
    pub items: Vec<ResearchItem>,
    pub steps: Vec<StepStatus>,
    pub report: Option<String>,
    pub failure: Option<FailureReason>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self {
            run_id: None,
            topic: String::new(),
            state: RunState::Idle,
            items: Vec::new(),
            steps: default_steps(),
            report: None,
            failure: None,
            started_at: None,
            finished_at: None,
        }
    }
}

impl RunContext {
    /// Whether `run_id` is the run this context currently belongs to
    pub fn is_current(&self, run_id: Uuid) -> bool {
        self.run_id == Some(run_id)
    }

    /// Clear all prior data and enter `Decomposing` under a fresh run id
    pub fn begin(&mut self, topic: &str) -> Uuid {
        let run_id = Uuid::new_v4();
        *self = RunContext {
            run_id: Some(run_id),
            topic: topic.to_string(),
            started_at: Some(Utc::now()),
            ..RunContext::default()
        };
        self.state.advance();
        self.set_step(Phase::Decompose, StepState::Loading);
        run_id
    }

    /// Materialize the item sequence and move on to `Researching`
    pub fn questions_ready(&mut self, questions: &[String]) {
        self.items = questions.iter().map(ResearchItem::pending).collect();
        self.set_step(Phase::Decompose, StepState::Completed);
        self.state.advance();
        self.set_step(Phase::Research, StepState::Loading);
    }

    /// Set the answer of item `index`.
    ///
    /// An answer is written once: returns false if the index is out of
    /// range or the item already holds a non-empty answer.
    pub fn record_answer(&mut self, index: usize, answer: &str) -> bool {
        match self.items.get_mut(index) {
            Some(item) if !item.is_answered() => {
                item.answer = answer.to_string();
                true
            }
            _ => false,
        }
    }

    /// All items researched; move on to `Compiling`
    pub fn research_complete(&mut self) {
        self.set_step(Phase::Research, StepState::Completed);
        self.state.advance();
        self.set_step(Phase::Compile, StepState::Loading);
    }

    /// Store the report and finish the run
    pub fn complete(&mut self, report: String) {
        self.report = Some(report);
        self.set_step(Phase::Compile, StepState::Completed);
        self.state.advance();
        self.finished_at = Some(Utc::now());
    }

    /// Stop the run. Steps stay as they were at the point of failure.
    pub fn fail(&mut self, reason: FailureReason) {
        if self.state.fail() {
            self.failure = Some(reason);
            self.finished_at = Some(Utc::now());
        }
    }

    /// Back to idle defaults
    pub fn reset(&mut self) {
        *self = RunContext::default();
    }

    fn set_step(&mut self, phase: Phase, status: StepState) {
        if let Some(step) = self.steps.iter_mut().find(|s| s.phase == phase) {
            step.status = status;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::error::FailureKind;

    fn statuses(ctx: &RunContext) -> Vec<StepState> {
        ctx.steps.iter().map(|s| s.status).collect()
    }

    fn failure() -> FailureReason {
        FailureReason {
            kind: FailureKind::Generic,
            message: FailureKind::Generic.user_message().to_string(),
            detail: "boom".to_string(),
        }
    }

    #[test]
    fn test_default_steps() {
        let steps = default_steps();
        assert_eq!(steps.len(), 3);
        assert_eq!(
            steps.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(steps.iter().all(|s| s.status == StepState::Pending));
        assert_eq!(steps[1].label, "Conduct Deep Research");
    }

    #[test]
    fn test_begin_clears_previous_run() {
        let mut ctx = RunContext::default();
        let first = ctx.begin("first");
        ctx.questions_ready(&["Q1".to_string()]);
        ctx.fail(failure());

        let second = ctx.begin("second");
        assert_ne!(first, second);
        assert!(ctx.is_current(second));
        assert!(!ctx.is_current(first));
        assert_eq!(ctx.topic, "second");
        assert_eq!(ctx.state, RunState::Decomposing);
        assert!(ctx.items.is_empty());
        assert!(ctx.failure.is_none());
        assert_eq!(
            statuses(&ctx),
            vec![StepState::Loading, StepState::Pending, StepState::Pending]
        );
    }

    #[test]
    fn test_full_lifecycle_steps() {
        let mut ctx = RunContext::default();
        ctx.begin("X");
        ctx.questions_ready(&["Q1".to_string(), "Q2".to_string()]);
        assert_eq!(ctx.state, RunState::Researching);
        assert_eq!(
            statuses(&ctx),
            vec![StepState::Completed, StepState::Loading, StepState::Pending]
        );

        assert!(ctx.record_answer(0, "A1"));
        assert!(ctx.record_answer(1, "A2"));
        ctx.research_complete();
        assert_eq!(ctx.state, RunState::Compiling);
        assert_eq!(
            statuses(&ctx),
            vec![StepState::Completed, StepState::Completed, StepState::Loading]
        );

        ctx.complete("Report body".to_string());
        assert_eq!(ctx.state, RunState::Complete);
        assert_eq!(ctx.report.as_deref(), Some("Report body"));
        assert!(ctx.finished_at.is_some());
        assert!(statuses(&ctx).iter().all(|s| *s == StepState::Completed));
    }

    #[test]
    fn test_answer_is_written_once() {
        let mut ctx = RunContext::default();
        ctx.begin("X");
        ctx.questions_ready(&["Q1".to_string(), "Q2".to_string()]);

        assert!(ctx.record_answer(1, "A2"));
        assert!(!ctx.record_answer(1, "changed"));
        assert!(!ctx.record_answer(5, "out of range"));

        assert_eq!(ctx.items[0], ResearchItem::pending("Q1"));
        assert_eq!(ctx.items[1], ResearchItem::answered("Q2", "A2"));
    }

    #[test]
    fn test_empty_answer_leaves_item_unanswered() {
        let mut ctx = RunContext::default();
        ctx.begin("X");
        ctx.questions_ready(&["Q1".to_string()]);

        assert!(ctx.record_answer(0, ""));
        assert!(!ctx.items[0].is_answered());
        assert!(ctx.record_answer(0, "late answer"));
        assert_eq!(ctx.items[0].answer, "late answer");
    }

    #[test]
    fn test_fail_freezes_steps() {
        let mut ctx = RunContext::default();
        ctx.begin("X");
        ctx.questions_ready(&["Q1".to_string()]);
        ctx.fail(failure());

        assert_eq!(ctx.state, RunState::Failed);
        assert!(ctx.failure.is_some());
        assert_eq!(
            statuses(&ctx),
            vec![StepState::Completed, StepState::Loading, StepState::Pending]
        );
    }

    #[test]
    fn test_fail_ignored_when_not_running() {
        let mut ctx = RunContext::default();
        ctx.fail(failure());
        assert_eq!(ctx.state, RunState::Idle);
        assert!(ctx.failure.is_none());
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut ctx = RunContext::default();
        ctx.begin("X");
        ctx.questions_ready(&["Q1".to_string()]);
        ctx.record_answer(0, "A1");

        ctx.reset();
        assert_eq!(ctx, RunContext::default());
        assert!(ctx.run_id.is_none());
    }
}
