//! # Run State
//!
//! The phase state machine of a research run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a research run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// No run has been started, or the last one was reset
    #[default]
    Idle,
    /// Splitting the topic into sub-questions
    Decomposing,
    /// Answering sub-questions one at a time
    Researching,
    /// Synthesizing the final report
    Compiling,
    /// Report available
    Complete,
    /// Run stopped with a failure reason
    Failed,
}

impl RunState {
    /// Advance to the next phase on success.
    ///
    /// Terminal states stay where they are; only a context reset leaves them.
    pub fn advance(&mut self) {
        *self = match self {
            RunState::Idle => RunState::Decomposing,
            RunState::Decomposing => RunState::Researching,
            RunState::Researching => RunState::Compiling,
            RunState::Compiling => RunState::Complete,
            RunState::Complete => RunState::Complete,
            RunState::Failed => RunState::Failed,
        };
    }

    /// Jump to `Failed`. Returns false if the run was not in progress.
    pub fn fail(&mut self) -> bool {
        if self.is_active() {
            *self = RunState::Failed;
            true
        } else {
            false
        }
    }

    /// A phase is in progress
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RunState::Decomposing | RunState::Researching | RunState::Compiling
        )
    }

    /// Check if the run has finished, successfully or not
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Complete | RunState::Failed)
    }

    /// `start` is only valid when no run is in progress
    pub fn accepts_start(&self) -> bool {
        !self.is_active()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Decomposing => "decomposing",
            RunState::Researching => "researching",
            RunState::Compiling => "compiling",
            RunState::Complete => "complete",
            RunState::Failed => "failed",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_state_advance() {
        let mut state = RunState::default();
        assert_eq!(state, RunState::Idle);

        state.advance();
        assert_eq!(state, RunState::Decomposing);
        state.advance();
        assert_eq!(state, RunState::Researching);
        state.advance();
        assert_eq!(state, RunState::Compiling);
        state.advance();
        assert_eq!(state, RunState::Complete);

        // Terminal states do not move
        state.advance();
        assert_eq!(state, RunState::Complete);
    }

    #[test]
    fn test_fail_only_from_active_states() {
        for active in [
            RunState::Decomposing,
            RunState::Researching,
            RunState::Compiling,
        ] {
            let mut state = active;
            assert!(state.fail());
            assert_eq!(state, RunState::Failed);
        }

        for inactive in [RunState::Idle, RunState::Complete, RunState::Failed] {
            let mut state = inactive;
            assert!(!state.fail());
            assert_eq!(state, inactive);
        }
    }

    #[test]
    fn test_failed_is_sticky() {
        let mut state = RunState::Researching;
        state.fail();
        state.advance();
        assert_eq!(state, RunState::Failed);
    }

    #[test]
    fn test_accepts_start() {
        assert!(RunState::Idle.accepts_start());
        assert!(RunState::Complete.accepts_start());
        assert!(RunState::Failed.accepts_start());
        assert!(!RunState::Decomposing.accepts_start());
        assert!(!RunState::Researching.accepts_start());
        assert!(!RunState::Compiling.accepts_start());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&RunState::Decomposing).unwrap();
        assert_eq!(json, "\"decomposing\"");
        assert_eq!(RunState::Compiling.to_string(), "compiling");
    }
}
