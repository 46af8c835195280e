use crate::logging::emit_sse_parse_error;
use crate::types::ApiEvent;
use anyhow::Result;

const RECOGNIZED_EVENT_TYPES: [&str; 6] = [
    "message_start",
    "content_block_start",
    "content_block_delta",
    "content_block_stop",
    "message_delta",
    "message_stop",
];

/// Incremental SSE framer for the Messages API stream. Chunks may split
/// frames anywhere; incomplete frames stay buffered until the next call.
#[derive(Default)]
pub struct StreamParser {
    buffer: String,
    pending_bytes: Vec<u8>,
}

impl StreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, chunk: &[u8]) -> Result<Vec<ApiEvent>> {
        self.push_utf8(chunk);
        let mut events = Vec::new();
        let mut start = 0;

        while let Some(end) = self.buffer[start..].find("\n\n") {
            let event_end = start + end + 2;
            let event_text = &self.buffer[start..event_end];

            let mut event_type = None;
            let mut data = None;

            for line in event_text.lines() {
                if let Some(rest) = line.strip_prefix("event:") {
                    event_type = Some(rest.trim().to_string());
                } else if let Some(rest) = line.strip_prefix("data:") {
                    data = Some(rest.trim().to_string());
                }
            }

            if let (Some(evt_type), Some(json_data)) = (event_type, data) {
                if json_data != "[DONE]" && RECOGNIZED_EVENT_TYPES.contains(&evt_type.as_str()) {
                    match serde_json::from_str::<ApiEvent>(&json_data) {
                        Ok(evt) => events.push(evt),
                        Err(e) => emit_sse_parse_error(Some(&evt_type), &json_data, &e),
                    }
                }
            }

            start = event_end;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }

        Ok(events)
    }

    // A multi-byte character split across chunks is held back until complete.
    fn push_utf8(&mut self, chunk: &[u8]) {
        self.pending_bytes.extend_from_slice(chunk);
        match std::str::from_utf8(&self.pending_bytes) {
            Ok(text) => {
                self.buffer.push_str(text);
                self.pending_bytes.clear();
            }
            Err(error) if error.error_len().is_none() => {
                let valid = error.valid_up_to();
                let text = String::from_utf8_lossy(&self.pending_bytes[..valid]).into_owned();
                self.buffer.push_str(&text);
                self.pending_bytes.drain(..valid);
            }
            Err(_) => {
                let text = String::from_utf8_lossy(&self.pending_bytes).into_owned();
                self.buffer.push_str(&text);
                self.pending_bytes.clear();
            }
        }
    }
}
