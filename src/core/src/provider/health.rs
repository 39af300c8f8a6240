use repochat_protocol::HealthReport;
use serde_json::Value;

use super::{ModelSelection, ProviderKind};
use crate::chat::is_truthy;

const MODEL_KEYS: [&str; 4] = ["name", "id", "model", "modelId"];
const DATA_KEYS: [&str; 4] = ["id", "name", "model", "modelId"];

/// Check that the selected backend is reachable.
///
/// The local provider is asked for `GET {base}/models`; the cloud provider
/// only needs a key to be configured.
pub async fn check_health(http: &reqwest::Client, selection: &ModelSelection) -> HealthReport {
    let provider = selection.kind.as_str();
    match selection.kind {
        ProviderKind::Cloud => {
            if selection.api_key.is_some() {
                report("ok", provider, "Cloud AI configured", None)
            } else {
                report("error", provider, "Missing API Key", None)
            }
        }
        ProviderKind::Local => match fetch_models(http, selection).await {
            Ok(Some(models)) => report("ok", provider, "Local AI is ready", Some(models)),
            Ok(None) => report(
                "error",
                provider,
                "Local AI service reachable but returned error",
                None,
            ),
            Err(err) => {
                tracing::warn!(base_url = %selection.base_url, "llm health check failed: {err}");
                report(
                    "error",
                    provider,
                    &format!("Failed to connect to AI provider: {err}"),
                    None,
                )
            }
        },
    }
}

/// `Ok(None)` when the service answered with a non-success status.
async fn fetch_models(
    http: &reqwest::Client,
    selection: &ModelSelection,
) -> Result<Option<Vec<String>>, super::ProviderError> {
    let url = selection.endpoint("models")?;
    let response = http.get(url).send().await?;
    if !response.status().is_success() {
        return Ok(None);
    }
    // An unparseable body still counts as reachable.
    let body = response.json::<Value>().await.unwrap_or(Value::Null);
    Ok(Some(parse_model_names(&body)))
}

/// Model names from any of the list shapes OpenAI-compatible servers use.
pub fn parse_model_names(body: &Value) -> Vec<String> {
    if let Some(items) = body.as_array() {
        return names(items, &MODEL_KEYS);
    }
    if let Some(items) = body.get("models").and_then(Value::as_array) {
        return names(items, &MODEL_KEYS);
    }
    if let Some(tags) = body.get("tags").and_then(Value::as_array) {
        return tags
            .iter()
            .map(|tag| match tag {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .filter(|name| !name.is_empty())
            .collect();
    }
    if let Some(items) = body.get("data").and_then(Value::as_array) {
        return names(items, &DATA_KEYS);
    }
    Vec::new()
}

fn names(items: &[Value], keys: &[&str]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| {
            keys.iter()
                .filter_map(|key| item.get(*key))
                .find(|value| is_truthy(value))
                .map(|value| match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
        })
        .collect()
}

fn report(
    status: &str,
    provider: &str,
    message: &str,
    models: Option<Vec<String>>,
) -> HealthReport {
    HealthReport {
        status: status.to_string(),
        provider: provider.to_string(),
        message: message.to_string(),
        models,
    }
}
