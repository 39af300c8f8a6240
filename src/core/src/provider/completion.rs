use repochat_protocol::{ChatResponse, RawMessage};
use serde::Serialize;
use serde_json::{json, Map, Value};

use super::{ModelSelection, ProviderError};
use crate::chat::resolve_text;
use crate::tools::{error_result, ToolRegistry};

const MODEL_COMMAND: &str = "/model";
const FORWARDED_ROLES: [&str; 3] = ["user", "assistant", "system"];
/// Model round trips per chat request, tool steps included.
pub const MAX_STEPS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendMessage {
    pub role: String,
    pub content: String,
}

/// A lone message reading `/model` asks for diagnostics instead of a reply.
pub fn is_model_command(messages: &[RawMessage]) -> bool {
    let [only] = messages else {
        return false;
    };
    only.field("content")
        .and_then(Value::as_str)
        .is_some_and(|content| content.trim().eq_ignore_ascii_case(MODEL_COMMAND))
}

/// Flatten client history to plain `{role, content}` turns, system first.
///
/// Tool turns and turns without text are left out; the backend only sees
/// prose.
pub fn backend_messages(system: &str, raw: &[RawMessage]) -> Vec<BackendMessage> {
    let mut out = Vec::with_capacity(raw.len() + 1);
    if !system.is_empty() {
        out.push(BackendMessage {
            role: "system".to_string(),
            content: system.to_string(),
        });
    }
    for message in raw {
        let role = message
            .field("role")
            .or_else(|| message.nested_field("role"))
            .and_then(Value::as_str)
            .unwrap_or("assistant");
        if !FORWARDED_ROLES.contains(&role) {
            continue;
        }
        let content = resolve_text(message);
        if content.trim().is_empty() {
            continue;
        }
        out.push(BackendMessage {
            role: role.to_string(),
            content,
        });
    }
    out
}

/// Run a non-streaming completion against `{base}/chat/completions`.
///
/// When `tools` is enabled its descriptors are offered to the model, and
/// requested calls are executed and fed back for up to [`MAX_STEPS`]
/// round trips. Calls and results are recorded as `tool-call` and
/// `tool-result` items under `response.messages`.
pub async fn complete(
    http: &reqwest::Client,
    selection: &ModelSelection,
    system: &str,
    raw: &[RawMessage],
    tools: &ToolRegistry,
) -> Result<ChatResponse, ProviderError> {
    let api_key = selection
        .api_key
        .as_deref()
        .ok_or(ProviderError::MissingApiKey)?;
    let url = selection.endpoint("chat/completions")?;
    let tool_specs = tool_specs(tools);

    let mut conversation: Vec<Value> = backend_messages(system, raw)
        .into_iter()
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect();
    let mut transcript = Transcript::default();

    for step in 1..=MAX_STEPS {
        let mut body = json!({
            "model": selection.model_id,
            "messages": conversation,
            "stream": false,
        });
        if !tool_specs.is_empty() {
            body["tools"] = Value::Array(tool_specs.clone());
        }
        tracing::debug!(
            model = %selection.model_id,
            provider = selection.kind.as_str(),
            step,
            turns = conversation.len(),
            "chat completion request"
        );

        let response = http
            .post(url.clone())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let reply: Value = response.json().await?;
        let mut parsed = parse_step(&reply, step)?;
        transcript.add_usage(reply.get("usage"));
        if tool_specs.is_empty() {
            parsed.tool_calls.clear();
        }

        if parsed.tool_calls.is_empty() {
            return Ok(transcript.finish(parsed));
        }

        conversation.push(json!({
            "role": "assistant",
            "content": parsed.text,
            "tool_calls": parsed.tool_calls.iter().map(ToolCall::to_backend).collect::<Vec<_>>(),
        }));
        let mut call_items = Vec::with_capacity(parsed.tool_calls.len());
        let mut result_items = Vec::with_capacity(parsed.tool_calls.len());
        for call in &parsed.tool_calls {
            let result = match tools
                .invoke(&call.name, Value::String(call.arguments.clone()))
                .await
            {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!(tool = %call.name, error = %err, "model tool call failed");
                    error_result(err.to_string())
                }
            };
            conversation.push(json!({
                "role": "tool",
                "tool_call_id": call.id,
                "content": result_text(&result),
            }));
            call_items.push(call.call_item());
            result_items.push(call.result_item(result));
        }
        transcript.record_tools(parsed.text.as_deref(), call_items, result_items);

        if step == MAX_STEPS {
            tracing::warn!(steps = MAX_STEPS, "tool loop hit the step limit");
            return Ok(transcript.finish(parsed));
        }
    }
    Err(ProviderError::InvalidResponse("no completion steps ran".to_string()))
}

fn tool_specs(tools: &ToolRegistry) -> Vec<Value> {
    if !tools.enabled() {
        return Vec::new();
    }
    tools
        .list()
        .into_iter()
        .map(|tool| {
            json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters,
                },
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
struct ToolCall {
    id: String,
    name: String,
    /// JSON text, as the backend sends it.
    arguments: String,
}

impl ToolCall {
    fn to_backend(&self) -> Value {
        json!({
            "id": self.id,
            "type": "function",
            "function": {"name": self.name, "arguments": self.arguments},
        })
    }

    fn args(&self) -> Value {
        if self.arguments.trim().is_empty() {
            return json!({});
        }
        serde_json::from_str(&self.arguments).unwrap_or_else(|_| json!(self.arguments))
    }

    fn call_item(&self) -> Value {
        json!({
            "type": "tool-call",
            "toolCallId": self.id,
            "toolName": self.name,
            "args": self.args(),
        })
    }

    fn result_item(&self, result: Value) -> Value {
        json!({
            "type": "tool-result",
            "toolCallId": self.id,
            "toolName": self.name,
            "args": self.args(),
            "result": result,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    text: Option<String>,
    finish_reason: Option<String>,
    tool_calls: Vec<ToolCall>,
}

fn parse_step(body: &Value, step: usize) -> Result<Step, ProviderError> {
    let choice = body
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .ok_or_else(|| ProviderError::InvalidResponse("missing choices".to_string()))?;
    let text = choice
        .pointer("/message/content")
        .and_then(Value::as_str)
        .map(str::to_string);
    let finish_reason = choice
        .get("finish_reason")
        .and_then(Value::as_str)
        .map(str::to_string);
    let tool_calls = choice
        .pointer("/message/tool_calls")
        .and_then(Value::as_array)
        .map(|calls| {
            calls
                .iter()
                .enumerate()
                .filter_map(|(index, call)| {
                    let name = call.pointer("/function/name").and_then(Value::as_str)?;
                    let id = call
                        .get("id")
                        .and_then(Value::as_str)
                        .filter(|id| !id.is_empty())
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("call_{step}_{index}"));
                    let arguments = match call.pointer("/function/arguments") {
                        Some(Value::String(s)) => s.clone(),
                        None | Some(Value::Null) => String::new(),
                        Some(other) => other.to_string(),
                    };
                    Some(ToolCall {
                        id,
                        name: name.to_string(),
                        arguments,
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(Step {
        text,
        finish_reason,
        tool_calls,
    })
}

fn result_text(result: &Value) -> String {
    match result {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn text_items(text: Option<&str>) -> impl Iterator<Item = Value> + '_ {
    text.filter(|t| !t.is_empty())
        .map(|t| json!({"type": "text", "text": t}))
        .into_iter()
}

/// What the reply accumulates across steps.
#[derive(Debug, Default)]
struct Transcript {
    messages: Vec<Value>,
    tool_calls: Vec<Value>,
    tool_results: Vec<Value>,
    usage: Map<String, Value>,
}

impl Transcript {
    /// Token counts are summed over steps.
    fn add_usage(&mut self, usage: Option<&Value>) {
        let Some(usage) = usage.and_then(Value::as_object) else {
            return;
        };
        for (key, value) in usage {
            let Some(count) = value.as_u64() else {
                continue;
            };
            let total = self.usage.get(key).and_then(Value::as_u64).unwrap_or(0);
            self.usage.insert(key.clone(), json!(total + count));
        }
    }

    fn record_tools(&mut self, text: Option<&str>, calls: Vec<Value>, results: Vec<Value>) {
        let content: Vec<Value> = text_items(text).chain(calls.iter().cloned()).collect();
        self.messages
            .push(json!({"role": "assistant", "content": content}));
        self.messages
            .push(json!({"role": "tool", "content": results.clone()}));
        self.tool_calls.extend(calls);
        self.tool_results.extend(results);
    }

    fn finish(mut self, last: Step) -> ChatResponse {
        // The final step of a capped tool loop was already recorded.
        if last.tool_calls.is_empty() {
            let content: Vec<Value> = text_items(last.text.as_deref()).collect();
            self.messages
                .push(json!({"role": "assistant", "content": content}));
        }
        ChatResponse {
            status: "ok".to_string(),
            text: last.text,
            tool_calls: self.tool_calls,
            tool_results: self.tool_results,
            finish_reason: last.finish_reason,
            usage: Value::Object(self.usage),
            response: json!({"messages": self.messages}),
        }
    }
}
