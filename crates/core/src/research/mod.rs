//! # Research Orchestration
//!
//! Drives one research run at a time through three phases.
//!
//! ## Pipeline Flow
//!
//! ```text
//! Topic → Decompose → Research (one question at a time, paced) → Compile → Report
//! ```

pub mod context;
pub mod controller;
pub mod error;
pub mod events;
pub mod generator;
pub mod pipeline;
pub mod progress;

pub use context::{Phase, ResearchItem, RunContext, StepState, StepStatus};
pub use controller::{
    ResearchConfig, ResearchController, RunHandle, RunOutcome, DECOMPOSER, RESEARCHER,
    SYNTHESIZER,
};
pub use error::{FailureKind, FailureReason, GenerationError, PipelineError};
pub use events::{ResearchEvent, ResearchEventKind};
pub use generator::{LlmGenerator, TextGenerator, DEFAULT_QUESTION_COUNT};
pub use pipeline::RunState;
pub use progress::{ItemProgress, ProgressSnapshot, PREVIEW_CHARS};
