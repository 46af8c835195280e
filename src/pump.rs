//! Incremental renderer for an agent's response stream.
//!
//! Text deltas accumulate into the live surface, each render replacing it
//! with the full buffer. A tool invocation is the only flush point: pending
//! text is committed to the current surface, a tool notice is shown, and
//! later text goes to a fresh surface.

use crate::agent::RawEventStream;
use crate::debug_log::DebugLog;
use crate::render::{RenderCommand, RenderSink};
use crate::types::StreamEvent;
use crate::util::truncate_for_log;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

pub const STREAM_FAILED_NOTICE: &str = "ストリーミング中にエラーが発生しました";
pub const CANCELLED_NOTICE: &str = "処理を中断しました";

pub fn tool_notice(tool_name: &str) -> String {
    format!("{tool_name} ツールを実行中…")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PumpOutcome {
    Completed,
    Failed(String),
    Cancelled,
}

/// Per-session render state. Owned by one pump run.
#[derive(Debug, Default)]
pub struct RenderState {
    accumulated_text: String,
    surfaces_opened: usize,
}

impl RenderState {
    fn open<S: RenderSink + ?Sized>(sink: &mut S) -> Self {
        let mut state = Self::default();
        state.open_surface(sink);
        state
    }

    pub fn accumulated_text(&self) -> &str {
        &self.accumulated_text
    }

    pub fn surfaces_opened(&self) -> usize {
        self.surfaces_opened
    }

    fn open_surface<S: RenderSink + ?Sized>(&mut self, sink: &mut S) {
        sink.apply(RenderCommand::OpenSurface);
        self.surfaces_opened += 1;
    }

    fn handle<S: RenderSink + ?Sized>(&mut self, event: StreamEvent, sink: &mut S) {
        match event {
            StreamEvent::ToolInvocationStart { tool_name } => {
                if !self.accumulated_text.is_empty() {
                    let committed = std::mem::take(&mut self.accumulated_text);
                    sink.apply(RenderCommand::ReplaceLive(committed));
                }
                sink.apply(RenderCommand::Notice(tool_notice(&tool_name)));
                self.open_surface(sink);
            }
            StreamEvent::TextDelta { text } => {
                self.accumulated_text.push_str(&text);
                sink.apply(RenderCommand::ReplaceLive(self.accumulated_text.clone()));
            }
            StreamEvent::Unrecognized => {}
        }
    }
}

pub struct StreamPump {
    log: DebugLog,
}

impl StreamPump {
    pub fn new(log: DebugLog) -> Self {
        Self { log }
    }

    /// Consume `events` in arrival order until it ends, fails, or `cancel`
    /// fires. Content already rendered is left as it is on every exit.
    pub async fn run<S: RenderSink + ?Sized>(
        &self,
        mut events: RawEventStream,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> PumpOutcome {
        let mut state = RenderState::open(sink);
        let mut received = 0usize;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.log.push(format!("stream cancelled after {received} events"));
                    sink.apply(RenderCommand::Error(CANCELLED_NOTICE.to_string()));
                    return PumpOutcome::Cancelled;
                }
                next = events.next() => next,
            };

            let Some(item) = next else {
                self.log.push(format!(
                    "stream completed: {received} events, {} surfaces",
                    state.surfaces_opened()
                ));
                return PumpOutcome::Completed;
            };

            match item {
                Ok(raw) => {
                    received += 1;
                    let event = StreamEvent::decode(&raw);
                    if event == StreamEvent::Unrecognized {
                        self.log.push(format!(
                            "ignored event: {}",
                            truncate_for_log(&raw.to_string(), 160)
                        ));
                    }
                    state.handle(event, sink);
                }
                Err(error) => {
                    self.log.push(format!("stream failed after {received} events: {error:#}"));
                    sink.apply(RenderCommand::Error(STREAM_FAILED_NOTICE.to_string()));
                    return PumpOutcome::Failed(error.to_string());
                }
            }
        }
    }
}
