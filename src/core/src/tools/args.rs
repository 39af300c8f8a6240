use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::ToolError;

/// Decode tool arguments.
///
/// Models send arguments as an object, as a JSON-encoded string, or not at
/// all; null and blank strings mean "no arguments".
pub(super) fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, ToolError> {
    let value = match args {
        Value::Null => Value::Object(Map::new()),
        Value::String(raw) if raw.trim().is_empty() => Value::Object(Map::new()),
        Value::String(raw) => serde_json::from_str(&raw).map_err(|e| invalid(tool, e))?,
        other => other,
    };
    serde_json::from_value(value).map_err(|e| invalid(tool, e))
}

fn invalid(tool: &str, err: serde_json::Error) -> ToolError {
    ToolError::InvalidArguments {
        tool: tool.to_string(),
        message: err.to_string(),
    }
}
