use repochat_protocol::{RawMessage, ToolInvocation, ToolState};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::text::response_messages;

/// Tool calls and results carried by one message.
///
/// A non-empty `toolInvocations` list from the producer is trusted as-is.
/// Otherwise `tool-call` / `tool-result` items are collected from the
/// `response` envelope in sub-message order, then item order.
///
/// Ids synthesized here assume the message sits at position 0. Use
/// [`extract_invocations_at`] to get the ids [`normalize`](super::normalize)
/// assigns to a message elsewhere in a history.
pub fn extract_invocations(message: &RawMessage) -> Vec<ToolInvocation> {
    extract_invocations_at(message, 0)
}

/// Like [`extract_invocations`], with the message position in its history
/// mixed into synthesized ids so they stay unique across a conversation.
pub fn extract_invocations_at(message: &RawMessage, position: usize) -> Vec<ToolInvocation> {
    if let Some(list) = message.field("toolInvocations").and_then(Value::as_array) {
        if !list.is_empty() {
            return list
                .iter()
                .enumerate()
                .filter_map(|(index, entry)| {
                    let entry = entry.as_object()?;
                    Some(from_normalized(entry, &IdSeed::new(position, 0, index)))
                })
                .collect();
        }
    }

    let Some(messages) = response_messages(message) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for (sub, entry) in messages.iter().enumerate() {
        let contents: &[Value] = match entry.get("content") {
            Some(Value::Array(items)) => items.as_slice(),
            Some(other) if super::is_truthy(other) => std::slice::from_ref(other),
            _ => &[],
        };
        for (index, item) in contents.iter().enumerate() {
            let Some(item) = item.as_object() else {
                continue;
            };
            let state = match item.get("type").and_then(Value::as_str) {
                Some("tool-call") => ToolState::Call,
                Some("tool-result") => ToolState::Result,
                _ => continue,
            };
            out.push(ToolInvocation {
                tool_name: string_field(item, "toolName").unwrap_or_default(),
                state,
                args: args_or_empty(item),
                result: item.get("result").cloned(),
                tool_call_id: call_id(item, &IdSeed::new(position, sub + 1, index)),
            });
        }
    }
    out
}

fn from_normalized(entry: &Map<String, Value>, seed: &IdSeed) -> ToolInvocation {
    let result = entry.get("result").cloned();
    let state = match entry.get("state").and_then(Value::as_str) {
        Some("result") => ToolState::Result,
        Some(_) => ToolState::Call,
        None if result.is_some() => ToolState::Result,
        None => ToolState::Call,
    };
    ToolInvocation {
        tool_name: string_field(entry, "toolName").unwrap_or_default(),
        state,
        args: args_or_empty(entry),
        result,
        tool_call_id: call_id(entry, seed),
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

fn args_or_empty(map: &Map<String, Value>) -> Value {
    match map.get("args") {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(args) => args.clone(),
    }
}

fn call_id(map: &Map<String, Value>, seed: &IdSeed) -> String {
    match map.get("toolCallId").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => seed.synthesize(map),
    }
}

/// Where an id-less item sits: message position, sub-message, item index.
struct IdSeed {
    position: usize,
    sub: usize,
    index: usize,
}

impl IdSeed {
    fn new(position: usize, sub: usize, index: usize) -> Self {
        Self {
            position,
            sub,
            index,
        }
    }

    /// Name-based uuid, so re-normalizing the same history yields the same
    /// ids and rendered list keys stay stable while a reply streams in.
    fn synthesize(&self, item: &Map<String, Value>) -> String {
        let name = format!(
            "{}/{}/{}/{}",
            self.position,
            self.sub,
            self.index,
            Value::Object(item.clone())
        );
        let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes());
        format!("call_{}", id.simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extract(value: Value) -> Vec<ToolInvocation> {
        extract_invocations(&RawMessage::new(value))
    }

    #[test]
    fn tool_call_in_response_envelope() {
        let msg = json!({
            "response": {"messages": [{
                "role": "assistant",
                "content": [{"type": "tool-call", "toolName": "get_status", "toolCallId": "abc", "args": {}}]
            }]}
        });
        let invocations = extract(msg);
        assert_eq!(
            invocations,
            vec![ToolInvocation {
                tool_name: "get_status".into(),
                state: ToolState::Call,
                args: json!({}),
                result: None,
                tool_call_id: "abc".into(),
            }]
        );
    }

    #[test]
    fn calls_and_results_stay_separate_and_ordered() {
        let msg = json!({
            "response": {"messages": [
                {"role": "assistant", "content": [
                    {"type": "text", "text": "checking"},
                    {"type": "tool-call", "toolName": "get_recent_commits", "toolCallId": "c1", "args": {"limit": 3}}
                ]},
                {"role": "tool", "content": {"type": "tool-result", "toolName": "get_recent_commits", "toolCallId": "c1", "result": []}}
            ]}
        });
        let invocations = extract(msg);
        assert_eq!(invocations.len(), 2);
        assert_eq!(invocations[0].state, ToolState::Call);
        assert_eq!(invocations[0].args, json!({"limit": 3}));
        assert_eq!(invocations[1].state, ToolState::Result);
        assert_eq!(invocations[1].result, Some(json!([])));
        assert_eq!(invocations[0].tool_call_id, invocations[1].tool_call_id);
    }

    #[test]
    fn missing_ids_are_synthesized_and_distinct() {
        let msg = json!({
            "response": {"messages": [{"role": "assistant", "content": [
                {"type": "tool-call", "toolName": "get_status"},
                {"type": "tool-call", "toolName": "get_status"}
            ]}]}
        });
        let invocations = extract(msg.clone());
        assert_eq!(invocations.len(), 2);
        assert!(invocations[0].tool_call_id.starts_with("call_"));
        assert_ne!(invocations[0].tool_call_id, invocations[1].tool_call_id);
        assert_eq!(extract(msg), invocations);
    }

    #[test]
    fn position_changes_synthesized_ids() {
        let msg = RawMessage::new(json!({
            "response": {"messages": [{"role": "assistant", "content": [{"type": "tool-call"}]}]}
        }));
        let first = extract_invocations_at(&msg, 0);
        let second = extract_invocations_at(&msg, 1);
        assert_ne!(first[0].tool_call_id, second[0].tool_call_id);
    }

    #[test]
    fn pre_normalized_list_takes_precedence() {
        let msg = json!({
            "toolInvocations": [{
                "toolName": "get_status", "state": "result", "args": {},
                "result": {"branch": "main"}, "toolCallId": "pre"
            }],
            "response": {"messages": [{"role": "assistant", "content": [
                {"type": "tool-call", "toolName": "other", "toolCallId": "env"}
            ]}]}
        });
        let invocations = extract(msg);
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].tool_call_id, "pre");
        assert_eq!(invocations[0].state, ToolState::Result);
        assert_eq!(invocations[0].result, Some(json!({"branch": "main"})));
    }

    #[test]
    fn empty_pre_normalized_list_falls_back_to_envelope() {
        let msg = json!({
            "toolInvocations": [],
            "response": {"messages": [{"role": "assistant", "content": [
                {"type": "tool-result", "toolName": "get_status", "toolCallId": "env", "result": "ok"}
            ]}]}
        });
        let invocations = extract(msg);
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].tool_call_id, "env");
    }

    #[test]
    fn pre_normalized_entries_get_ids_and_defaults() {
        let msg = json!({"toolInvocations": [{"toolName": "get_status"}, "junk"]});
        let invocations = extract(msg);
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].state, ToolState::Call);
        assert_eq!(invocations[0].args, json!({}));
        assert!(invocations[0].tool_call_id.starts_with("call_"));
    }

    #[test]
    fn other_item_types_and_malformed_envelopes() {
        assert!(extract(json!({})).is_empty());
        assert!(extract(json!(null)).is_empty());
        assert!(extract(json!({"response": {"messages": {}}})).is_empty());
        assert!(extract(json!({"response": {"messages": [null, {"content": null}]}})).is_empty());
        let msg = json!({"response": {"messages": [{"role": "assistant", "content": [
            {"type": "text", "text": "x"}, {"toolName": "untyped"}, 7
        ]}]}});
        assert!(extract(msg).is_empty());
    }
}
