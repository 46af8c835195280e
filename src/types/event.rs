//! Decoding of the agent's raw response envelopes.
//!
//! The agent stream carries loosely shaped JSON envelopes. They are decoded
//! into the closed [`StreamEvent`] union here, at the boundary, so nothing
//! downstream picks keys out ad hoc.

use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    ToolInvocationStart { tool_name: String },
    TextDelta { text: String },
    Unrecognized,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    event: Option<EventBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventBody {
    #[serde(default)]
    content_block_start: Option<BlockStart>,
}

#[derive(Debug, Deserialize)]
struct BlockStart {
    #[serde(default)]
    start: Option<BlockStartBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockStartBody {
    #[serde(default)]
    tool_use: Option<ToolUseStart>,
}

#[derive(Debug, Deserialize)]
struct ToolUseStart {
    #[serde(default)]
    name: Option<String>,
}

impl StreamEvent {
    /// Decode one raw envelope. A tool start takes precedence over text when
    /// an envelope carries both.
    pub fn decode(raw: &Value) -> Self {
        let Ok(envelope) = Envelope::deserialize(raw) else {
            return Self::Unrecognized;
        };

        let tool_name = envelope
            .event
            .and_then(|event| event.content_block_start)
            .and_then(|block| block.start)
            .and_then(|start| start.tool_use)
            .and_then(|tool_use| tool_use.name)
            .filter(|name| !name.is_empty());
        if let Some(tool_name) = tool_name {
            return Self::ToolInvocationStart { tool_name };
        }

        match envelope.data {
            Some(Value::String(text)) => Self::TextDelta { text },
            _ => Self::Unrecognized,
        }
    }
}

pub fn text_envelope(text: &str) -> Value {
    json!({ "data": text })
}

pub fn tool_start_envelope(name: &str, tool_use_id: &str) -> Value {
    json!({
        "event": {
            "contentBlockStart": {
                "start": {
                    "toolUse": { "name": name, "toolUseId": tool_use_id }
                }
            }
        }
    })
}
