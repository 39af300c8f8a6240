use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A message object as emitted by the model backend or the browser client.
///
/// The shape is owned by the producer and changes between SDK versions, so
/// the raw JSON is kept verbatim. `null` entries are valid and mean "nothing
/// here yet".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawMessage(pub Value);

impl RawMessage {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    /// Look up a field, treating anything that is not an object as empty.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.0.as_object().and_then(|map| map.get(key))
    }

    /// Look up a field nested under the secondary `message` envelope.
    pub fn nested_field(&self, key: &str) -> Option<&Value> {
        self.field("message")
            .and_then(Value::as_object)
            .and_then(|map| map.get(key))
    }
}

impl From<Value> for RawMessage {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Lifecycle state of a tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolState {
    /// The model asked for the tool to run.
    Call,
    /// The tool finished and produced `result`.
    Result,
}

impl ToolState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Result => "result",
        }
    }
}

/// One tool call or tool result surfaced next to message text.
///
/// A call and its later result are separate records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    pub tool_name: String,
    pub state: ToolState,
    pub args: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Always set; synthesized when the producer did not supply one.
    pub tool_call_id: String,
}

/// One role-grouped turn of the conversation, ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub role: String,
    pub text: String,
    pub tool_invocations: Vec<ToolInvocation>,
    pub is_streaming: bool,
}

/// What the presentation layer should show as a message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RenderedContent {
    /// Nothing to show.
    Hidden,
    /// Resolved message text.
    Text(String),
    /// Transient placeholder while the backend is still producing the turn.
    Placeholder(String),
    /// Bounded JSON dump of a message that resolved to nothing.
    Preview(String),
    /// Last-resort marker when even the preview is empty.
    Ellipsis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub role: String,
    pub body: RenderedContent,
    pub tool_invocations: Vec<ToolInvocation>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_message_keeps_unknown_fields() {
        let raw: RawMessage =
            serde_json::from_value(json!({"role": "user", "x-extra": [1, 2]})).unwrap();
        assert_eq!(raw.field("x-extra"), Some(&json!([1, 2])));
        assert_eq!(serde_json::to_value(&raw).unwrap()["role"], "user");
    }

    #[test]
    fn raw_message_accepts_null() {
        let raw: Vec<RawMessage> = serde_json::from_str("[null, {}]").unwrap();
        assert!(raw[0].is_null());
        assert!(raw[0].field("role").is_none());
        assert!(!raw[1].is_null());
    }

    #[test]
    fn nested_field_reads_message_envelope() {
        let raw = RawMessage::new(json!({"message": {"role": "tool"}}));
        assert_eq!(raw.nested_field("role"), Some(&json!("tool")));
        assert!(RawMessage::new(json!({"message": "flat"}))
            .nested_field("role")
            .is_none());
    }

    #[test]
    fn tool_invocation_uses_camel_case_and_omits_missing_result() {
        let inv = ToolInvocation {
            tool_name: "get_status".into(),
            state: ToolState::Call,
            args: json!({}),
            result: None,
            tool_call_id: "abc".into(),
        };
        let value = serde_json::to_value(&inv).unwrap();
        assert_eq!(
            value,
            json!({"toolName": "get_status", "state": "call", "args": {}, "toolCallId": "abc"})
        );
    }

    #[test]
    fn normalized_message_wire_shape() {
        let msg = NormalizedMessage {
            id: None,
            role: "user".into(),
            text: "Hello!".into(),
            tool_invocations: vec![],
            is_streaming: false,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"role": "user", "text": "Hello!", "toolInvocations": [], "isStreaming": false})
        );
    }

    #[test]
    fn rendered_content_tagging() {
        let placeholder = RenderedContent::Placeholder("Thinking...".into());
        let value = serde_json::to_value(placeholder).unwrap();
        assert_eq!(value, json!({"kind": "placeholder", "value": "Thinking..."}));
        let value = serde_json::to_value(RenderedContent::Hidden).unwrap();
        assert_eq!(value, json!({"kind": "hidden"}));
    }
}
