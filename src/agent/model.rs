use super::{Agent, RawEventStream};
use crate::api::{ApiClient, StreamParser};
use crate::debug_log::DebugLog;
use crate::tools::ToolSet;
use crate::types::{text_envelope, tool_start_envelope, ApiEvent, ApiMessage, ContentBlock};
use anyhow::{bail, Result};
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

/// Agent backed by the streaming Messages API.
///
/// Each response round is forwarded as envelopes while it streams. When the
/// round ends with tool calls, the tools run one at a time, their results go
/// back to the model and the next round streams into the same sequence.
pub struct ModelAgent {
    client: Arc<ApiClient>,
    system_prompt: String,
    max_tool_rounds: usize,
    log: DebugLog,
}

impl ModelAgent {
    pub fn new(
        client: ApiClient,
        system_prompt: impl Into<String>,
        max_tool_rounds: usize,
        log: DebugLog,
    ) -> Self {
        Self {
            client: Arc::new(client),
            system_prompt: system_prompt.into(),
            max_tool_rounds,
            log,
        }
    }
}

impl Agent for ModelAgent {
    fn stream_respond(
        &self,
        prompt: String,
        tools: Arc<dyn ToolSet>,
        cancel: CancellationToken,
    ) -> RawEventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let turn = Turn {
            client: Arc::clone(&self.client),
            system_prompt: self.system_prompt.clone(),
            max_tool_rounds: self.max_tool_rounds,
            tools,
            log: self.log.clone(),
            tx,
        };
        tokio::spawn(turn.drive(prompt, cancel));
        Box::pin(UnboundedReceiverStream::new(rx))
    }
}

struct Turn {
    client: Arc<ApiClient>,
    system_prompt: String,
    max_tool_rounds: usize,
    tools: Arc<dyn ToolSet>,
    log: DebugLog,
    tx: mpsc::UnboundedSender<Result<Value>>,
}

#[derive(Default)]
struct RoundState {
    text: String,
    tool_uses: Vec<PendingToolUse>,
    stop_reason: Option<String>,
}

struct PendingToolUse {
    index: usize,
    id: String,
    name: String,
    input: Value,
    input_json: String,
}

impl Turn {
    async fn drive(self, prompt: String, cancel: CancellationToken) {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.log.push("agent turn cancelled");
                return;
            }
            result = self.run(prompt) => result,
        };
        if let Err(error) = result {
            let _ = self.tx.send(Err(error));
        }
    }

    async fn run(&self, prompt: String) -> Result<()> {
        let definitions = self.tools.definitions();
        let mut messages = vec![ApiMessage::user_text(prompt)];

        for round in 1..=self.max_tool_rounds {
            let mut stream = self
                .client
                .create_stream(&self.system_prompt, &messages, &definitions)
                .await?;
            let mut parser = StreamParser::new();
            let mut state = RoundState::default();

            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                for event in parser.process(&chunk)? {
                    if !self.forward(&mut state, event) {
                        self.log.push("event receiver dropped; agent turn stopped");
                        return Ok(());
                    }
                }
            }

            let RoundState {
                text,
                tool_uses,
                stop_reason,
            } = state;
            self.log.push(format!(
                "round {round}: {} text chars, {} tool calls, stop_reason={}",
                text.chars().count(),
                tool_uses.len(),
                stop_reason.as_deref().unwrap_or("none")
            ));
            if tool_uses.is_empty() {
                return Ok(());
            }

            let tool_uses: Vec<PendingToolUse> = tool_uses
                .into_iter()
                .map(|tool_use| self.finish_input(tool_use))
                .collect();

            let mut assistant_blocks = Vec::with_capacity(tool_uses.len() + 1);
            if !text.is_empty() {
                assistant_blocks.push(ContentBlock::Text { text });
            }
            assistant_blocks.extend(tool_uses.iter().map(|tool_use| ContentBlock::ToolUse {
                id: tool_use.id.clone(),
                name: tool_use.name.clone(),
                input: tool_use.input.clone(),
            }));
            messages.push(ApiMessage::assistant_blocks(assistant_blocks));

            let mut results = Vec::with_capacity(tool_uses.len());
            for tool_use in tool_uses {
                let output = self.tools.invoke(&tool_use.name, tool_use.input).await;
                results.push(ContentBlock::ToolResult {
                    tool_use_id: tool_use.id,
                    content: output.content,
                    is_error: output.is_error,
                });
            }
            messages.push(ApiMessage::user_blocks(results));
        }

        bail!(
            "model kept calling tools after {} rounds",
            self.max_tool_rounds
        )
    }

    /// Forward one API event as an envelope. Returns false once nobody is
    /// listening.
    fn forward(&self, state: &mut RoundState, event: ApiEvent) -> bool {
        let envelope = match event {
            ApiEvent::MessageStart { message } => {
                json!({ "event": { "messageStart": { "role": message.role } } })
            }
            ApiEvent::ContentBlockStart {
                index,
                content_block,
            } => match content_block {
                ContentBlock::ToolUse { id, name, input } => {
                    let envelope = tool_start_envelope(&name, &id);
                    state.tool_uses.push(PendingToolUse {
                        index,
                        id,
                        name,
                        input,
                        input_json: String::new(),
                    });
                    envelope
                }
                ContentBlock::Text { text } if !text.is_empty() => {
                    state.text.push_str(&text);
                    text_envelope(&text)
                }
                ContentBlock::Text { .. } | ContentBlock::ToolResult { .. } => return true,
            },
            ApiEvent::ContentBlockDelta { index, delta } => {
                if let Some(partial_json) = delta.partial_json {
                    if let Some(tool_use) = state
                        .tool_uses
                        .iter_mut()
                        .find(|tool_use| tool_use.index == index)
                    {
                        tool_use.input_json.push_str(&partial_json);
                    }
                }
                match delta.text {
                    Some(text) if !text.is_empty() => {
                        state.text.push_str(&text);
                        text_envelope(&text)
                    }
                    _ => return true,
                }
            }
            ApiEvent::MessageDelta { delta } => {
                state.stop_reason = delta.stop_reason.clone();
                json!({ "event": { "messageDelta": { "stopReason": delta.stop_reason } } })
            }
            ApiEvent::MessageStop => json!({ "event": { "messageStop": {} } }),
            ApiEvent::ContentBlockStop { .. } | ApiEvent::Unknown => return true,
        };

        self.tx.send(Ok(envelope)).is_ok()
    }

    fn finish_input(&self, mut tool_use: PendingToolUse) -> PendingToolUse {
        let raw = tool_use.input_json.trim();
        if raw.is_empty() {
            return tool_use;
        }
        match serde_json::from_str::<Value>(raw) {
            Ok(input) => tool_use.input = input,
            Err(error) => self.log.push(format!(
                "tool `{}` input is not valid JSON ({error}); sending {}",
                tool_use.name, tool_use.input
            )),
        }
        tool_use
    }
}
