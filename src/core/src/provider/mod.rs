//! Model backend selection and the thin HTTP client around it.

use std::collections::BTreeMap;

use repochat_protocol::ModelInfo;
use thiserror::Error;
use url::Url;

use crate::repochat_config::ModelsConfig;
use crate::settings::{AI_PROVIDER, OPENAI_API_KEY, OPENAI_BASE_URL};

mod completion;
mod health;

pub use completion::{backend_messages, complete, is_model_command, MAX_STEPS};
pub use health::{check_health, parse_model_names};

/// Ollama ignores the key, but the OpenAI-compatible API still wants a
/// bearer token.
const LOCAL_API_KEY: &str = "ollama";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(
        "OPENAI_API_KEY is required when AI_PROVIDER=cloud. Set OPENAI_API_KEY or switch AI_PROVIDER to local to use Ollama."
    )]
    MissingApiKey,

    #[error("invalid base url `{url}`: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid backend response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Local,
    Cloud,
}

impl ProviderKind {
    /// Anything other than `local` selects the cloud provider.
    pub fn parse(value: &str) -> Self {
        if value.trim() == "local" {
            Self::Local
        } else {
            Self::Cloud
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Cloud => "cloud",
        }
    }
}

/// Process environment overrides, captured once so resolution stays pure.
#[derive(Debug, Clone, Default)]
pub struct ProviderEnv {
    pub ai_provider: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
}

impl ProviderEnv {
    pub fn from_process() -> Self {
        let read = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            ai_provider: read(AI_PROVIDER),
            openai_api_key: read(OPENAI_API_KEY),
            openai_base_url: read(OPENAI_BASE_URL),
        }
    }
}

/// A concrete backend to talk to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub kind: ProviderKind,
    pub base_url: String,
    pub api_key: Option<String>,
    pub model_id: String,
}

impl ModelSelection {
    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            provider: self.kind.as_str().to_string(),
            base_url: self.base_url.clone(),
            model_id: self.model_id.clone(),
        }
    }

    /// `{base_url}/{path}` as a parsed URL.
    pub fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        let raw = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        Url::parse(&raw).map_err(|e| ProviderError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })
    }
}

/// Provider precedence: env, then stored setting, then `local`.
pub fn provider_kind(settings: &BTreeMap<String, String>, env: &ProviderEnv) -> ProviderKind {
    let stored = settings.get(AI_PROVIDER).filter(|v| !v.trim().is_empty());
    env.ai_provider
        .as_ref()
        .or(stored)
        .map(|v| ProviderKind::parse(v))
        .unwrap_or(ProviderKind::Local)
}

/// Pick the backend without requiring credentials. Used by diagnostics.
pub fn select_model(
    settings: &BTreeMap<String, String>,
    env: &ProviderEnv,
    models: &ModelsConfig,
) -> ModelSelection {
    match provider_kind(settings, env) {
        ProviderKind::Local => {
            let base_url = settings
                .get(OPENAI_BASE_URL)
                .filter(|v| !v.trim().is_empty())
                .or(env.openai_base_url.as_ref())
                .cloned()
                .unwrap_or_else(|| models.local_base_url.clone());
            ModelSelection {
                kind: ProviderKind::Local,
                base_url,
                api_key: Some(LOCAL_API_KEY.to_string()),
                model_id: models.local_model.clone(),
            }
        }
        ProviderKind::Cloud => {
            let api_key = env
                .openai_api_key
                .as_ref()
                .or(settings.get(OPENAI_API_KEY).filter(|v| !v.trim().is_empty()))
                .cloned();
            ModelSelection {
                kind: ProviderKind::Cloud,
                base_url: models.cloud_base_url.clone(),
                api_key,
                model_id: models.cloud_model.clone(),
            }
        }
    }
}

/// Pick the backend for a real request; the cloud provider needs a key.
pub fn resolve_model(
    settings: &BTreeMap<String, String>,
    env: &ProviderEnv,
    models: &ModelsConfig,
) -> Result<ModelSelection, ProviderError> {
    let selection = select_model(settings, env, models);
    if selection.api_key.is_none() {
        return Err(ProviderError::MissingApiKey);
    }
    Ok(selection)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_to_local_ollama() {
        let selection = resolve_model(
            &settings(&[]),
            &ProviderEnv::default(),
            &ModelsConfig::default(),
        )
        .unwrap();
        assert_eq!(selection.kind, ProviderKind::Local);
        assert_eq!(selection.base_url, "http://localhost:11434/v1");
        assert_eq!(selection.model_id, "llama3.2");
        assert_eq!(selection.api_key.as_deref(), Some("ollama"));
    }

    #[test]
    fn env_provider_beats_stored_provider() {
        let env = ProviderEnv {
            ai_provider: Some("local".into()),
            ..Default::default()
        };
        let stored = settings(&[(AI_PROVIDER, "cloud")]);
        assert_eq!(provider_kind(&stored, &env), ProviderKind::Local);
        assert_eq!(
            provider_kind(&stored, &ProviderEnv::default()),
            ProviderKind::Cloud
        );
    }

    #[test]
    fn stored_base_url_beats_env_for_local() {
        let env = ProviderEnv {
            openai_base_url: Some("http://env:11434/v1".into()),
            ..Default::default()
        };
        let models = ModelsConfig::default();
        let stored = settings(&[(OPENAI_BASE_URL, "http://db:11434/v1")]);
        assert_eq!(
            select_model(&stored, &env, &models).base_url,
            "http://db:11434/v1"
        );
        assert_eq!(
            select_model(&settings(&[]), &env, &models).base_url,
            "http://env:11434/v1"
        );
    }

    #[test]
    fn env_key_beats_stored_key_for_cloud() {
        let env = ProviderEnv {
            ai_provider: Some("cloud".into()),
            openai_api_key: Some("sk-env".into()),
            ..Default::default()
        };
        let stored = settings(&[(OPENAI_API_KEY, "sk-db")]);
        let selection = resolve_model(&stored, &env, &ModelsConfig::default()).unwrap();
        assert_eq!(selection.api_key.as_deref(), Some("sk-env"));
        assert_eq!(selection.model_id, "gpt-4o-mini");
        assert_eq!(selection.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn cloud_without_key_is_an_error() {
        let stored = settings(&[(AI_PROVIDER, "cloud")]);
        let env = ProviderEnv::default();
        let models = ModelsConfig::default();
        let err = resolve_model(&stored, &env, &models).unwrap_err();
        assert!(matches!(err, ProviderError::MissingApiKey));
        let info = select_model(&stored, &env, &models).info();
        assert_eq!(info.provider, "cloud");
    }

    #[test]
    fn endpoint_joins_paths() {
        let stored = settings(&[(OPENAI_BASE_URL, "http://gpu:11434/v1/")]);
        let selection = select_model(&stored, &ProviderEnv::default(), &ModelsConfig::default());
        assert_eq!(
            selection.endpoint("models").unwrap().as_str(),
            "http://gpu:11434/v1/models"
        );

        let broken = ModelSelection {
            base_url: "::nope::".into(),
            ..selection
        };
        assert!(matches!(
            broken.endpoint("models"),
            Err(ProviderError::InvalidBaseUrl { .. })
        ));
    }
}
