use serde_json::{Map, Value};

/// One fragment of message content, classified by shape.
///
/// Producers never tag their parts consistently, so the variant is decided
/// by [`MessagePart::classify`] in a fixed priority order:
///
/// 1. a bare string,
/// 2. `delta` (in-flight fragments win over any static field),
/// 3. `{type: "text", text}`,
/// 4. `{type: "raw", data}`,
/// 5. untagged `text`,
/// 6. untagged `content`,
/// 7. untagged `value`,
/// 8. `tool-call` / `tool-result` items, which are never text,
/// 9. anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagePart<'a> {
    Plain(&'a str),
    Delta(&'a str),
    Text(&'a str),
    Raw(&'a str),
    TextField(&'a str),
    ContentField(&'a str),
    ValueField(&'a str),
    ToolCall,
    ToolResult,
    Unknown,
}

impl<'a> MessagePart<'a> {
    pub fn classify(value: &'a Value) -> Self {
        match value {
            Value::String(s) => Self::Plain(s),
            Value::Object(map) => Self::classify_object(map),
            _ => Self::Unknown,
        }
    }

    fn classify_object(map: &'a Map<String, Value>) -> Self {
        let str_field = move |key: &str| map.get(key).and_then(Value::as_str);
        let tag = str_field("type");

        if let Some(delta) = str_field("delta") {
            return Self::Delta(delta);
        }
        match (tag, str_field("text"), str_field("data")) {
            (Some("text"), Some(text), _) => return Self::Text(text),
            (Some("raw"), _, Some(data)) => return Self::Raw(data),
            _ => {}
        }
        if let Some(text) = str_field("text") {
            return Self::TextField(text);
        }
        if let Some(content) = str_field("content") {
            return Self::ContentField(content);
        }
        if let Some(value) = str_field("value") {
            return Self::ValueField(value);
        }
        match tag {
            Some("tool-call") => Self::ToolCall,
            Some("tool-result") => Self::ToolResult,
            _ => Self::Unknown,
        }
    }

    /// Text carried by this part, if it is a text-bearing shape.
    pub fn text(&self) -> Option<&'a str> {
        match *self {
            Self::Plain(s)
            | Self::Delta(s)
            | Self::Text(s)
            | Self::Raw(s)
            | Self::TextField(s)
            | Self::ContentField(s)
            | Self::ValueField(s) => Some(s),
            Self::ToolCall | Self::ToolResult | Self::Unknown => None,
        }
    }
}

/// Plain text of a single part, or `None` for tool items and unknown shapes.
pub fn extract_text(part: &Value) -> Option<&str> {
    MessagePart::classify(part).text()
}

/// Flatten `value` (a part or arbitrarily nested arrays of parts) and
/// concatenate the text of every element in order, with no separator.
pub fn text_from_parts(value: &Value) -> String {
    text_from_part_list(std::iter::once(value))
}

pub(crate) fn text_from_part_list<'a>(items: impl IntoIterator<Item = &'a Value>) -> String {
    let mut out = String::new();
    for part in flatten(items) {
        if let Some(text) = MessagePart::classify(part).text() {
            out.push_str(text);
        }
    }
    out
}

/// Depth-first, order-preserving flattening of nested arrays. Nulls vanish.
fn flatten<'a>(items: impl IntoIterator<Item = &'a Value>) -> Vec<&'a Value> {
    let mut stack: Vec<&'a Value> = items.into_iter().collect();
    stack.reverse();
    let mut flat = Vec::new();
    while let Some(value) = stack.pop() {
        match value {
            Value::Null => {}
            Value::Array(items) => stack.extend(items.iter().rev()),
            other => flat.push(other),
        }
    }
    flat
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_string_is_verbatim() {
        let part = json!("  hi ");
        assert_eq!(extract_text(&part), Some("  hi "));
    }

    #[test]
    fn delta_wins_over_static_fields() {
        let part = json!({"delta": "d", "type": "text", "text": "t", "content": "c"});
        assert_eq!(MessagePart::classify(&part), MessagePart::Delta("d"));
    }

    #[test]
    fn tagged_text_and_raw() {
        let text = json!({"type": "text", "text": "hello"});
        assert_eq!(MessagePart::classify(&text), MessagePart::Text("hello"));
        let raw = json!({"type": "raw", "data": "bytes", "content": "ignored"});
        assert_eq!(MessagePart::classify(&raw), MessagePart::Raw("bytes"));
    }

    #[test]
    fn raw_without_data_falls_back_to_untagged_fields() {
        let part = json!({"type": "raw", "content": "fallback"});
        assert_eq!(MessagePart::classify(&part), MessagePart::ContentField("fallback"));
    }

    #[test]
    fn untagged_fallback_order() {
        let part = json!({"text": "t", "content": "c", "value": "v"});
        assert_eq!(MessagePart::classify(&part), MessagePart::TextField("t"));
        let part = json!({"content": "c", "value": "v"});
        assert_eq!(MessagePart::classify(&part), MessagePart::ContentField("c"));
        let part = json!({"value": "v"});
        assert_eq!(MessagePart::classify(&part), MessagePart::ValueField("v"));
    }

    #[test]
    fn non_string_fields_are_not_text() {
        let part = json!({"delta": 3, "text": ["x"], "content": {"a": 1}, "value": null});
        assert_eq!(MessagePart::classify(&part), MessagePart::Unknown);
        assert_eq!(extract_text(&part), None);
    }

    #[test]
    fn tool_items_are_skipped() {
        let call = json!({"type": "tool-call", "toolName": "get_status", "args": {}});
        let result = json!({"type": "tool-result", "result": "clean"});
        assert_eq!(MessagePart::classify(&call), MessagePart::ToolCall);
        assert_eq!(MessagePart::classify(&result), MessagePart::ToolResult);
        assert_eq!(extract_text(&call), None);
        assert_eq!(extract_text(&result), None);
    }

    #[test]
    fn scalars_and_empty_objects_are_unknown() {
        for part in [json!(42), json!(true), json!({}), json!({"type": "image"})] {
            assert_eq!(extract_text(&part), None, "{part}");
        }
    }

    #[test]
    fn nested_collections_flatten_in_order() {
        let parts = json!([
            "a",
            [{"delta": "b"}, [[{"type": "text", "text": "c"}]]],
            null,
            {"type": "tool-call", "toolName": "x"},
            [[], [[]]],
            {"value": "d"}
        ]);
        assert_eq!(text_from_parts(&parts), "abcd");
    }

    #[test]
    fn single_part_and_empty_inputs() {
        assert_eq!(text_from_parts(&json!({"text": "solo"})), "solo");
        assert_eq!(text_from_parts(&json!(null)), "");
        assert_eq!(text_from_parts(&json!([[[[]]]])), "");
    }

    #[test]
    fn deeply_nested_single_part() {
        let mut value = json!("deep");
        for _ in 0..2_000 {
            value = Value::Array(vec![value]);
        }
        assert_eq!(text_from_parts(&value), "deep");
    }
}
