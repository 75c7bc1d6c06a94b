//! # Persisted Configuration
//!
//! Partial research config stored in `.stardust/config.json`, exposed over
//! `/api/v1/config` and applied when the server starts.

use axum::response::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use stardust_core::models::LlmProvider;
use stardust_core::research::ResearchConfig;
use utoipa::ToSchema;

pub const STARDUST_DIR: &str = ".stardust";

fn config_path() -> PathBuf {
    Path::new(STARDUST_DIR).join("config.json")
}

/// Persisted configuration (subset of ResearchConfig exposed to clients)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, ToSchema)]
pub struct PersistedConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pacing_delay_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_count: Option<usize>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub per_agent_models: HashMap<String, String>,
}

impl PersistedConfig {
    pub async fn load() -> Self {
        let path = config_path();
        if !path.exists() {
            return Self::default();
        }
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable config");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub async fn save(&self) -> Result<(), std::io::Error> {
        let path = config_path();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        tokio::fs::write(&path, content).await
    }

    pub fn merge(&mut self, other: PersistedConfig) {
        if other.global_provider.is_some() {
            self.global_provider = other.global_provider;
        }
        if other.global_model.is_some() {
            self.global_model = other.global_model;
        }
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
        if other.pacing_delay_ms.is_some() {
            self.pacing_delay_ms = other.pacing_delay_ms;
        }
        if other.question_count.is_some() {
            self.question_count = other.question_count;
        }
        for (k, v) in other.per_agent_models {
            self.per_agent_models.insert(k, v);
        }
    }

    /// Overlay the persisted values on the defaults
    pub fn to_research_config(&self) -> ResearchConfig {
        let mut config = ResearchConfig::default();

        if let Some(ref p) = self.global_provider {
            match LlmProvider::from_id(p) {
                Some(provider) => config.global_provider = provider,
                None => tracing::warn!(provider = %p, "Unknown provider, keeping default"),
            }
        }
        config.global_model = self.global_model.clone();
        config.base_url = self.base_url.clone();
        if let Some(ms) = self.pacing_delay_ms {
            config.pacing_delay_ms = ms;
        }
        if let Some(count) = self.question_count {
            config.question_count = count.max(1);
        }
        config.per_agent_models = self.per_agent_models.clone();

        config
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConfigResponse {
    config: PersistedConfig,
    defaults: ConfigDefaults,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConfigDefaults {
    global_provider: &'static str,
    pacing_delay_ms: u64,
    question_count: usize,
    preview_chars: usize,
}

impl Default for ConfigDefaults {
    fn default() -> Self {
        let defaults = ResearchConfig::default();
        Self {
            global_provider: defaults.global_provider.id(),
            pacing_delay_ms: defaults.pacing_delay_ms,
            question_count: defaults.question_count,
            preview_chars: defaults.preview_chars,
        }
    }
}

// === Provider API Types ===

#[derive(Debug, Serialize, ToSchema)]
pub struct ProviderInfo {
    id: String,
    name: String,
    default_model: String,
    supports_base_url: bool,
    env_var: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProvidersResponse {
    providers: Vec<ProviderInfo>,
}

fn get_provider_info() -> Vec<ProviderInfo> {
    LlmProvider::all()
        .into_iter()
        .map(|p| ProviderInfo {
            id: p.id().to_string(),
            name: p.display_name().to_string(),
            default_model: p.default_model().to_string(),
            supports_base_url: p.supports_base_url(),
            env_var: p.env_var().to_string(),
        })
        .collect()
}

// === Config Handlers ===

/// Get current configuration
#[utoipa::path(
    get,
    path = "/api/v1/config",
    tag = "config",
    responses(
        (status = 200, description = "Current configuration and defaults", body = ConfigResponse)
    )
)]
pub async fn get_config() -> Json<ConfigResponse> {
    let config = PersistedConfig::load().await;
    Json(ConfigResponse {
        config,
        defaults: ConfigDefaults::default(),
    })
}

/// Update configuration (partial merge, applied on next server start)
#[utoipa::path(
    patch,
    path = "/api/v1/config",
    tag = "config",
    request_body = PersistedConfig,
    responses(
        (status = 200, description = "Updated configuration", body = ConfigResponse)
    )
)]
pub async fn update_config(Json(updates): Json<PersistedConfig>) -> Json<ConfigResponse> {
    let mut config = PersistedConfig::load().await;
    config.merge(updates);

    if let Err(e) = config.save().await {
        tracing::error!(error = %e, "Failed to save config");
    }

    Json(ConfigResponse {
        config,
        defaults: ConfigDefaults::default(),
    })
}

/// Get available LLM providers
#[utoipa::path(
    get,
    path = "/api/v1/providers",
    tag = "providers",
    responses(
        (status = 200, description = "List of supported LLM providers", body = ProvidersResponse)
    )
)]
pub async fn get_providers() -> Json<ProvidersResponse> {
    Json(ProvidersResponse {
        providers: get_provider_info(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_unset_fields() {
        let mut config = PersistedConfig {
            global_provider: Some("openai".to_string()),
            global_model: Some("gpt-4o".to_string()),
            ..Default::default()
        };
        let mut models = HashMap::new();
        models.insert("synthesizer".to_string(), "gpt-4.1".to_string());

        config.merge(PersistedConfig {
            pacing_delay_ms: Some(1000),
            per_agent_models: models,
            ..Default::default()
        });

        assert_eq!(config.global_provider.as_deref(), Some("openai"));
        assert_eq!(config.global_model.as_deref(), Some("gpt-4o"));
        assert_eq!(config.pacing_delay_ms, Some(1000));
        assert_eq!(config.per_agent_models["synthesizer"], "gpt-4.1");
    }

    #[test]
    fn test_to_research_config() {
        let persisted: PersistedConfig = serde_json::from_str(
            r#"{"global_provider": "anthropic", "question_count": 0, "pacing_delay_ms": 750}"#,
        )
        .unwrap();
        let config = persisted.to_research_config();

        assert_eq!(config.global_provider, LlmProvider::Anthropic);
        assert_eq!(config.question_count, 1);
        assert_eq!(config.pacing_delay_ms, 750);
        assert_eq!(config.preview_chars, 250);
    }

    #[test]
    fn test_unknown_provider_falls_back_to_default() {
        let persisted = PersistedConfig {
            global_provider: Some("nonexistent".to_string()),
            ..Default::default()
        };
        assert_eq!(
            persisted.to_research_config().global_provider,
            LlmProvider::Gemini
        );
    }

    #[test]
    fn test_empty_config_serializes_to_empty_object() {
        let json = serde_json::to_string(&PersistedConfig::default()).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn test_provider_info_lists_all_providers() {
        let providers = get_provider_info();
        assert_eq!(providers.len(), LlmProvider::all().len());
        assert!(providers
            .iter()
            .any(|p| p.id == "gemini" && p.env_var == "GEMINI_API_KEY"));
    }
}
