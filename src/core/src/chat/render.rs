use repochat_protocol::{NormalizedMessage, RenderedContent, RenderedMessage};

/// Shown in place of an assistant turn that has no text yet.
pub const STREAMING_PLACEHOLDER: &str = "Thinking...";

/// Upper bound on the debug preview, in characters.
pub const PREVIEW_MAX_CHARS: usize = 300;

const TRUNCATION_MARKER: char = '…';

/// Decide what body to show for one normalized message.
///
/// `is_last` plus `is_loading` identifies the turn the backend is still
/// producing.
pub fn render_message(
    message: &NormalizedMessage,
    is_loading: bool,
    is_last: bool,
) -> RenderedContent {
    let text = message.text.as_str();
    if message.role == "user" {
        return if text.is_empty() {
            RenderedContent::Hidden
        } else {
            RenderedContent::Text(text.to_string())
        };
    }

    if !text.is_empty() {
        return RenderedContent::Text(text.to_string());
    }
    if is_loading && is_last {
        return RenderedContent::Placeholder(STREAMING_PLACEHOLDER.to_string());
    }
    if !message.tool_invocations.is_empty() {
        return RenderedContent::Hidden;
    }
    match message_preview(message) {
        Some(preview) => RenderedContent::Preview(preview),
        None => RenderedContent::Ellipsis,
    }
}

pub fn render_conversation(
    messages: &[NormalizedMessage],
    is_loading: bool,
) -> Vec<RenderedMessage> {
    let last = messages.len().saturating_sub(1);
    messages
        .iter()
        .enumerate()
        .map(|(index, message)| RenderedMessage {
            id: message.id.clone(),
            role: message.role.clone(),
            body: render_message(message, is_loading, index == last),
            tool_invocations: message.tool_invocations.clone(),
        })
        .collect()
}

/// Pretty JSON of the whole message, cut at [`PREVIEW_MAX_CHARS`] with a
/// trailing `…` when anything was dropped.
pub fn message_preview(message: &NormalizedMessage) -> Option<String> {
    let json = serde_json::to_string_pretty(message).ok()?;
    if json.is_empty() {
        return None;
    }
    match json.char_indices().nth(PREVIEW_MAX_CHARS) {
        Some((cut, _)) => {
            let mut preview = json[..cut].to_string();
            preview.push(TRUNCATION_MARKER);
            Some(preview)
        }
        None => Some(json),
    }
}
