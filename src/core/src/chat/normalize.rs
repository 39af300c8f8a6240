use repochat_protocol::{NormalizedMessage, RawMessage};
use serde_json::Value;

use super::invocations::extract_invocations_at;
use super::is_truthy;
use super::text::resolve_text;

const DEFAULT_ROLE: &str = "assistant";

/// Reduce the full raw history to role-grouped turns.
///
/// Consecutive messages with the same role are merged into one entry: text
/// is appended, tool invocations are appended, the newest id wins and the
/// streaming flag is OR-ed. A role change always opens a new entry, even
/// when its text is empty. The output is rebuilt from scratch on every call.
pub fn normalize(raw: &[RawMessage]) -> Vec<NormalizedMessage> {
    let mut normalized: Vec<NormalizedMessage> = Vec::new();
    for (position, message) in raw.iter().enumerate() {
        if !is_truthy(message.as_value()) {
            continue;
        }
        let role = message_role(message);
        let text = resolve_text(message);
        let tool_invocations = extract_invocations_at(message, position);
        let id = message_id(message);
        let is_streaming = message.field("isStreaming").is_some_and(is_truthy);

        match normalized.last_mut() {
            Some(last) if last.role == role => {
                last.text.push_str(&text);
                last.tool_invocations.extend(tool_invocations);
                if id.is_some() {
                    last.id = id;
                }
                last.is_streaming |= is_streaming;
            }
            _ => normalized.push(NormalizedMessage {
                id,
                role,
                text,
                tool_invocations,
                is_streaming,
            }),
        }
    }
    normalized
}

fn message_role(message: &RawMessage) -> String {
    [message.field("role"), message.nested_field("role")]
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .find(|role| !role.is_empty())
        .unwrap_or(DEFAULT_ROLE)
        .to_string()
}

fn message_id(message: &RawMessage) -> Option<String> {
    match message.field("id")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
