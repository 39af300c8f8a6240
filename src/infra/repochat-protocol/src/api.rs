use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::{NormalizedMessage, RawMessage, RenderedMessage};

/// `POST /api/messages/normalize` body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizeRequest {
    #[serde(default)]
    pub messages: Vec<RawMessage>,
    /// Whether the backend is still producing the last turn.
    #[serde(default)]
    pub is_loading: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizeResponse {
    pub messages: Vec<NormalizedMessage>,
    pub rendered: Vec<RenderedMessage>,
}

/// `POST /api/chat` body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<RawMessage>,
}

/// Non-streaming chat reply.
///
/// `response.messages` holds the assistant reply in the same envelope shape
/// the normalizer reads, so clients can append it to their raw history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub status: String,
    pub text: Option<String>,
    /// Every tool call the model made, as `tool-call` items.
    #[serde(default)]
    pub tool_calls: Vec<Value>,
    /// Every tool result fed back to the model, as `tool-result` items.
    #[serde(default)]
    pub tool_results: Vec<Value>,
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub usage: Value,
    #[serde(default)]
    pub response: Value,
}

/// Answer to the `/model` diagnostic command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCommandResponse {
    pub status: String,
    pub model: ModelInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub provider: String,
    #[serde(rename = "baseURL")]
    pub base_url: String,
    pub model_id: String,
}

/// `GET /api/health/llm` answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub provider: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub models: Option<Vec<String>>,
}

/// `POST /api/settings` body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub provider: String,
    #[serde(default)]
    pub openai_key: Option<String>,
    #[serde(default)]
    pub ollama_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// JSON error body for non-2xx HTTP answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
