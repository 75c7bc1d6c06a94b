//! # StarDust Core
//!
//! Research orchestration for StarDust: split a topic into sub-questions,
//! research them one at a time, and compile the findings into a report.
//!
//! ## Architecture
//!
//! - `research/` - Run state machine, controller, and progress projection
//! - `skills/` - Structured LLM calls for each phase
//! - `models/` - Centralized LLM provider configuration
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stardust_core::research::{ResearchConfig, ResearchController};
//!
//! let controller = ResearchController::with_llm(ResearchConfig::default());
//! let outcome = controller.run("The history of the printing press").await?;
//! ```

pub mod models;
pub mod research;
pub mod skills;
