use repochat_protocol::RawMessage;
use serde_json::Value;

use super::is_truthy;
use super::parts::{text_from_part_list, text_from_parts};

/// Best-effort rendered text of one message. Empty means "no text yet".
///
/// Sources are tried in order and the first non-empty one wins: a direct
/// `content` string, the parts collection (under any of its aliases), the
/// assistant entries of a `response` envelope, and finally the results of
/// pre-normalized tool invocations.
pub fn resolve_text(message: &RawMessage) -> String {
    if let Some(content) = message.field("content").and_then(Value::as_str) {
        if !content.trim().is_empty() {
            return content.to_string();
        }
    }

    if let Some(parts) = parts_source(message) {
        let text = text_from_parts(parts);
        if !text.is_empty() {
            return text;
        }
    }

    let assistant = assistant_text(message);
    if !assistant.is_empty() {
        return assistant;
    }

    invocation_results_text(message)
}

/// First present parts collection. Producers disagree on where it lives.
fn parts_source(message: &RawMessage) -> Option<&Value> {
    [
        message.field("parts"),
        message.nested_field("parts"),
        message.nested_field("chunks"),
        message.field("chunks"),
        message.nested_field("content"),
    ]
    .into_iter()
    .flatten()
    .find(|value| is_truthy(value))
}

fn assistant_text(message: &RawMessage) -> String {
    let Some(messages) = response_messages(message) else {
        return String::new();
    };
    let contents = messages
        .iter()
        .filter(|entry| entry.get("role").and_then(Value::as_str) == Some("assistant"))
        .filter_map(|entry| entry.get("content"))
        .filter(|content| is_truthy(content));
    text_from_part_list(contents)
}

pub(super) fn response_messages(message: &RawMessage) -> Option<&Vec<Value>> {
    message
        .field("response")
        .and_then(|response| response.get("messages"))
        .and_then(Value::as_array)
}

fn invocation_results_text(message: &RawMessage) -> String {
    let Some(invocations) = message.field("toolInvocations").and_then(Value::as_array) else {
        return String::new();
    };
    invocations
        .iter()
        .map(|invocation| stringify_result(invocation.get("result")))
        .collect::<Vec<_>>()
        .join("\n")
}

fn stringify_result(result: Option<&Value>) -> String {
    match result {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
