//! # Research Events
//!
//! Discrete lifecycle events emitted by the controller, for streaming to
//! observers that want transitions rather than whole snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of research event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResearchEventKind {
    /// A run was accepted and entered decomposition
    RunStarted,
    /// A phase began
    PhaseStarted,
    /// A phase finished successfully
    PhaseCompleted,
    /// Sub-questions are known (data carries the list)
    QuestionsGenerated,
    /// One research item received its answer
    AnswerRecorded,
    /// Report stored, run complete
    RunCompleted,
    /// Run stopped with a classified failure
    RunFailed,
    /// Controller returned to idle
    RunReset,
}

/// An event in the research lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchEvent {
    /// Unique event ID
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub kind: ResearchEventKind,
    /// Run the event belongs to (absent for resets from idle)
    #[serde(default)]
    pub run_id: Option<Uuid>,
    /// Related research item index if applicable
    #[serde(default)]
    pub item_index: Option<usize>,
    /// Associated data (JSON)
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl ResearchEvent {
    pub fn new(kind: ResearchEventKind, run_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            kind,
            run_id,
            item_index: None,
            data: None,
        }
    }

    /// Add data to the event
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Attach the research item index
    pub fn with_item(mut self, index: usize) -> Self {
        self.item_index = Some(index);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let run_id = Uuid::new_v4();
        let event = ResearchEvent::new(ResearchEventKind::AnswerRecorded, Some(run_id))
            .with_item(2)
            .with_data(serde_json::json!({ "question": "Q3" }));

        assert_eq!(event.run_id, Some(run_id));
        assert_eq!(event.item_index, Some(2));
        assert_eq!(event.data.unwrap()["question"], "Q3");
    }

    #[test]
    fn test_event_serialization() {
        let event = ResearchEvent::new(ResearchEventKind::PhaseStarted, None);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"phase_started\""));
        assert!(json.contains("\"run_id\":null"));
    }
}
