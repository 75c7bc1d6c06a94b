//! # LLM Helpers
//!
//! Provider dispatch for structured LLM calls. Every skill goes through
//! `run_llm_function!`, and every provider error comes back through
//! [`into_generation_error`] so rate limits arrive tagged.

use radkit::agent::LlmFunction;
use radkit::errors::AgentError;
use radkit::models::{BaseLlm, LLMOutputTrait};
use schemars::JsonSchema;

use crate::research::error::{is_rate_limit_message, GenerationError};

/// Run one structured call against a model client
pub async fn call_structured<T>(
    llm: impl BaseLlm + 'static,
    system_prompt: &str,
    input: String,
) -> anyhow::Result<T>
where
    T: LLMOutputTrait + JsonSchema + Send + Sync + 'static,
{
    LlmFunction::<T>::new_with_system_instructions(llm, system_prompt)
        .run(input)
        .await
        .map_err(into_generation_error)
}

/// Convert a radkit error, tagging HTTP 429 and quota exhaustion as rate limits
pub fn into_generation_error(error: AgentError) -> anyhow::Error {
    match error {
        AgentError::LlmRateLimit { provider } => GenerationError::RateLimited {
            message: format!("{provider} rate limit exceeded"),
        }
        .into(),
        AgentError::LlmProvider { provider, message } if is_rate_limit_message(&message) => {
            GenerationError::RateLimited {
                message: format!("{provider}: {message}"),
            }
            .into()
        }
        other => other.into(),
    }
}

/// Macro to run an LlmFunction with any provider.
///
/// Expands to an `anyhow::Result<$output_type>`; must be used inside an
/// async function returning `anyhow::Result`.
#[macro_export]
macro_rules! run_llm_function {
    ($config:expr, $output_type:ty, $system_prompt:expr, $input:expr) => {{
        use radkit::models::providers::{
            AnthropicLlm, DeepSeekLlm, GeminiLlm, GrokLlm, OpenAILlm, OpenRouterLlm,
        };
        use $crate::models::LlmProvider;
        use $crate::skills::llm_helpers::{call_structured, into_generation_error};

        let config = $config;
        match config.provider {
            LlmProvider::Anthropic => {
                let llm = AnthropicLlm::from_env(&config.model).map_err(into_generation_error)?;
                call_structured::<$output_type>(llm, $system_prompt, $input).await
            }
            LlmProvider::OpenAI => {
                let mut llm = OpenAILlm::from_env(&config.model).map_err(into_generation_error)?;
                if let Some(base_url) = &config.base_url {
                    llm = llm.with_base_url(base_url);
                }
                call_structured::<$output_type>(llm, $system_prompt, $input).await
            }
            LlmProvider::Gemini => {
                let llm = GeminiLlm::from_env(&config.model).map_err(into_generation_error)?;
                call_structured::<$output_type>(llm, $system_prompt, $input).await
            }
            LlmProvider::OpenRouter => {
                let llm = OpenRouterLlm::from_env(&config.model).map_err(into_generation_error)?;
                call_structured::<$output_type>(llm, $system_prompt, $input).await
            }
            LlmProvider::Grok => {
                let llm = GrokLlm::from_env(&config.model).map_err(into_generation_error)?;
                call_structured::<$output_type>(llm, $system_prompt, $input).await
            }
            LlmProvider::DeepSeek => {
                let llm = DeepSeekLlm::from_env(&config.model).map_err(into_generation_error)?;
                call_structured::<$output_type>(llm, $system_prompt, $input).await
            }
        }
    }};
}

pub use run_llm_function;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::error::FailureKind;
    use crate::skills::research_skill::ResearchFindings;
    use radkit::test_support::{structured_response, FakeLlm};

    fn is_tagged_rate_limit(error: &anyhow::Error) -> bool {
        matches!(
            error.downcast_ref::<GenerationError>(),
            Some(GenerationError::RateLimited { .. })
        )
    }

    #[test]
    fn test_http_429_is_tagged() {
        let err = into_generation_error(AgentError::LlmRateLimit {
            provider: "Gemini".to_string(),
        });
        assert!(is_tagged_rate_limit(&err));
        assert_eq!(FailureKind::classify(&err), FailureKind::RateLimited);
    }

    #[test]
    fn test_quota_status_is_tagged() {
        let err = into_generation_error(AgentError::LlmProvider {
            provider: "Gemini".to_string(),
            message: "HTTP 400: RESOURCE_EXHAUSTED".to_string(),
        });
        assert!(is_tagged_rate_limit(&err));
    }

    #[test]
    fn test_other_provider_errors_stay_generic() {
        let err = into_generation_error(AgentError::LlmAuthentication {
            provider: "OpenAI".to_string(),
        });
        assert!(!is_tagged_rate_limit(&err));
        assert_eq!(FailureKind::classify(&err), FailureKind::Generic);

        let err = into_generation_error(AgentError::LlmProvider {
            provider: "OpenAI".to_string(),
            message: "HTTP 500: internal error".to_string(),
        });
        assert_eq!(FailureKind::classify(&err), FailureKind::Generic);
    }

    #[tokio::test]
    async fn test_call_structured_tags_rate_limited_response() {
        let fake = FakeLlm::with_responses(
            "fake-model",
            [Err(AgentError::LlmRateLimit {
                provider: "Gemini".to_string(),
            })],
        );

        let err = call_structured::<ResearchFindings>(fake.clone(), "system", "Q1".to_string())
            .await
            .unwrap_err();
        assert!(is_tagged_rate_limit(&err));
        assert_eq!(fake.call_count(), 1);
    }

    #[tokio::test]
    async fn test_call_structured_parses_output() {
        let fake = FakeLlm::with_responses(
            "fake-model",
            [Ok(structured_response(&ResearchFindings {
                answer: "A1".to_string(),
            }))],
        );

        let output = call_structured::<ResearchFindings>(fake, "system", "Q1".to_string())
            .await
            .unwrap();
        assert_eq!(output.answer, "A1");
    }
}
