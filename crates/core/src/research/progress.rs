//! # Progress Projection
//!
//! Read-only snapshot of a run, derived from [`RunContext`] after every
//! change and handed to whoever renders progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::context::{Phase, RunContext, StepStatus};
use super::error::FailureReason;
use super::pipeline::RunState;

/// Default number of characters kept in an answer preview
pub const PREVIEW_CHARS: usize = 250;

const ELLIPSIS: &str = "...";

/// Per-item view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemProgress {
    pub index: usize,
    pub question: String,
    /// Full answer text
    pub answer: String,
    /// Truncated answer, present once the item is answered
    pub preview: Option<String>,
    pub completed: bool,
}

/// Snapshot of a run for presentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub run_id: Option<Uuid>,
    pub state: RunState,
    /// Phase in progress, if any
    pub phase: Option<Phase>,
    pub topic: String,
    pub steps: Vec<StepStatus>,
    pub items: Vec<ItemProgress>,
    pub completed_items: usize,
    pub report: Option<String>,
    pub failure: Option<FailureReason>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Default for ProgressSnapshot {
    fn default() -> Self {
        Self::project(&RunContext::default(), PREVIEW_CHARS)
    }
}

impl ProgressSnapshot {
    /// Derive a snapshot from the run context
    pub fn project(ctx: &RunContext, preview_chars: usize) -> Self {
        let items: Vec<ItemProgress> = ctx
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| ItemProgress {
                index,
                question: item.question.clone(),
                answer: item.answer.clone(),
                preview: item
                    .is_answered()
                    .then(|| preview(&item.answer, preview_chars)),
                completed: item.is_answered(),
            })
            .collect();

        Self {
            run_id: ctx.run_id,
            state: ctx.state,
            phase: Phase::for_state(ctx.state),
            topic: ctx.topic.clone(),
            steps: ctx.steps.clone(),
            completed_items: items.iter().filter(|i| i.completed).count(),
            items,
            report: ctx.report.clone(),
            failure: ctx.failure.clone(),
            started_at: ctx.started_at,
            finished_at: ctx.finished_at,
        }
    }
}

/// First `limit` characters of `answer` followed by an ellipsis marker
pub fn preview(answer: &str, limit: usize) -> String {
    let mut out: String = answer.chars().take(limit).collect();
    out.push_str(ELLIPSIS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::context::StepState;

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let answer = "é".repeat(300);
        let p = preview(&answer, PREVIEW_CHARS);
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 3);
        assert!(p.ends_with("..."));
    }

    #[test]
    fn test_preview_of_short_answer() {
        assert_eq!(preview("Short.", PREVIEW_CHARS), "Short....");
    }

    #[test]
    fn test_idle_snapshot() {
        let snapshot = ProgressSnapshot::default();
        assert_eq!(snapshot.state, RunState::Idle);
        assert_eq!(snapshot.phase, None);
        assert!(snapshot.topic.is_empty());
        assert!(snapshot.items.is_empty());
        assert!(snapshot.report.is_none());
        assert!(snapshot.failure.is_none());
        assert!(snapshot
            .steps
            .iter()
            .all(|s| s.status == StepState::Pending));
    }

    #[test]
    fn test_projection_of_partial_research() {
        let mut ctx = RunContext::default();
        ctx.begin("X");
        ctx.questions_ready(&["Q1".to_string(), "Q2".to_string()]);
        ctx.record_answer(0, &"a".repeat(400));

        let snapshot = ProgressSnapshot::project(&ctx, PREVIEW_CHARS);
        assert_eq!(snapshot.phase, Some(Phase::Research));
        assert!(snapshot.state.is_active());
        assert_eq!(snapshot.completed_items, 1);

        let first = &snapshot.items[0];
        assert!(first.completed);
        assert_eq!(first.answer.len(), 400);
        assert_eq!(first.preview.as_ref().map(|p| p.len()), Some(253));

        let second = &snapshot.items[1];
        assert_eq!(second.index, 1);
        assert!(!second.completed);
        assert!(second.preview.is_none());
    }

    #[test]
    fn test_snapshot_json_shape() {
        let mut ctx = RunContext::default();
        ctx.begin("X");
        let json = serde_json::to_value(ProgressSnapshot::project(&ctx, 10)).unwrap();

        assert_eq!(json["state"], "decomposing");
        assert_eq!(json["phase"], "decompose");
        assert_eq!(json["steps"][0]["status"], "loading");
        assert_eq!(json["topic"], "X");
    }
}
