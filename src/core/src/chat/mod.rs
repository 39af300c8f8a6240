//! Reduction of a raw, partially streamed message history into a stable,
//! role-grouped conversation view.
//!
//! Everything here is pure: no I/O, no logging, no shared state. Callers
//! re-run [`normalize`] over the full history each time the stream advances
//! and replace the previous output.

mod invocations;
mod normalize;
mod parts;
mod render;
mod text;

pub use invocations::{extract_invocations, extract_invocations_at};
pub use normalize::normalize;
pub use parts::{extract_text, text_from_parts, MessagePart};
pub use render::{
    message_preview, render_conversation, render_message, PREVIEW_MAX_CHARS, STREAMING_PLACEHOLDER,
};
pub use text::resolve_text;

use serde_json::Value;

/// JavaScript-style truthiness, which is what message producers assume for
/// flags and optional fields.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
