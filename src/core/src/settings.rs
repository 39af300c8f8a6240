use repochat_protocol::SettingsUpdate;
use thiserror::Error;
use url::Url;

use crate::storage::SettingsStore;

pub const AI_PROVIDER: &str = "AI_PROVIDER";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";

const KNOWN_PROVIDERS: [&str; 2] = ["local", "cloud"];

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("unknown provider `{0}` (expected `local` or `cloud`)")]
    UnknownProvider(String),

    #[error("invalid base url `{url}`: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("settings storage: {0}")]
    Storage(String),
}

/// Apply a settings form submission.
///
/// The provider is always written; the API key and base URL only when the
/// form carried a non-empty value, so blank inputs keep what is stored.
pub fn update_settings(
    store: &dyn SettingsStore,
    update: &SettingsUpdate,
) -> Result<(), SettingsError> {
    let provider = update.provider.trim();
    if !KNOWN_PROVIDERS.contains(&provider) {
        return Err(SettingsError::UnknownProvider(provider.to_string()));
    }

    let base_url = non_empty(update.ollama_url.as_deref());
    if let Some(url) = base_url {
        Url::parse(url).map_err(|e| SettingsError::InvalidBaseUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    }

    store
        .upsert_setting(AI_PROVIDER, provider)
        .map_err(SettingsError::Storage)?;
    if let Some(key) = non_empty(update.openai_key.as_deref()) {
        store
            .upsert_setting(OPENAI_API_KEY, key)
            .map_err(SettingsError::Storage)?;
    }
    if let Some(url) = base_url {
        store
            .upsert_setting(OPENAI_BASE_URL, url)
            .map_err(SettingsError::Storage)?;
    }
    tracing::info!(provider, "settings updated");
    Ok(())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
