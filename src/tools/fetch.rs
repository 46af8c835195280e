use super::ToolDefinition;
use serde_json::json;

pub const FETCH_TOOL_NAME: &str = "fetch";

/// Hand-written definition used by the wrapped binding in place of the
/// process's own tool list.
pub fn fetch_definition() -> ToolDefinition {
    ToolDefinition {
        name: FETCH_TOOL_NAME.to_string(),
        description: "Fetches a URL from the internet and returns its contents as text."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "url": { "type": "string", "description": "URL to fetch" }
            },
            "required": ["url"]
        }),
    }
}
