//! # Research Errors
//!
//! Command rejections, collaborator error tags, and the failure
//! classification shown to the user when a run stops.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::pipeline::RunState;

/// Why a controller command was rejected
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("A research run is already in progress ({state})")]
    RunInProgress { state: RunState },

    #[error("Research topic must not be empty")]
    EmptyTopic,
}

/// Errors a text generator may raise to tag a failure explicitly.
///
/// Untagged errors are still classified by their message.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Rate limited by provider (429): {message}")]
    RateLimited { message: String },

    #[error("Invalid response from provider: {message}")]
    InvalidResponse { message: String },
}

/// Classified kind of a run failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The provider signalled an HTTP 429-equivalent condition
    RateLimited,
    /// Anything else: network, credentials, malformed output
    Generic,
}

impl FailureKind {
    /// Classify an error from any stage of a run
    pub fn classify(error: &anyhow::Error) -> Self {
        let tagged = error.chain().any(|cause| {
            matches!(
                cause.downcast_ref::<GenerationError>(),
                Some(GenerationError::RateLimited { .. })
            )
        });

        if tagged || is_rate_limit_message(&format!("{:#}", error)) {
            FailureKind::RateLimited
        } else {
            FailureKind::Generic
        }
    }

    /// Message shown to the user
    pub fn user_message(&self) -> &'static str {
        match self {
            FailureKind::RateLimited => {
                "We're experiencing high traffic. Please try again in a moment."
            }
            FailureKind::Generic => {
                "An error occurred during the research process. Please check your API key or try a different topic."
            }
        }
    }
}

/// Failure stored on a run that ended in `Failed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
    pub kind: FailureKind,
    /// User-facing message for `kind`
    pub message: String,
    /// Full error chain, for logs and diagnostics
    pub detail: String,
}

impl FailureReason {
    pub fn from_error(error: &anyhow::Error) -> Self {
        let kind = FailureKind::classify(error);
        Self {
            kind,
            message: kind.user_message().to_string(),
            detail: format!("{:#}", error),
        }
    }
}

static RATE_LIMIT_PATTERN: OnceLock<Regex> = OnceLock::new();

/// Word boundaries keep ids such as `req_4291` from matching
pub(crate) fn is_rate_limit_message(text: &str) -> bool {
    RATE_LIMIT_PATTERN
        .get_or_init(|| {
            Regex::new(
                r"(?i)\b429\b|too\s+many\s+requests|rate[_\-\s]?limit|resource[_\s]?exhausted|quota\s+exceeded",
            )
            .expect("rate limit pattern is valid")
        })
        .is_match(text)
}
