//! The model-driven agent that answers a prompt while calling tools.

mod model;
mod prompt;

pub use model::ModelAgent;
pub use prompt::{build_prompt, DEFAULT_SYSTEM_PROMPT};

use crate::tools::ToolSet;
use futures::Stream;
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Raw response envelopes in arrival order. Decoding happens downstream.
pub type RawEventStream = Pin<Box<dyn Stream<Item = anyhow::Result<Value>> + Send>>;

pub trait Agent: Send + Sync {
    /// Start answering `prompt`. Events are produced concurrently with their
    /// consumption; production stops when `cancel` fires or the stream is
    /// dropped.
    fn stream_respond(
        &self,
        prompt: String,
        tools: Arc<dyn ToolSet>,
        cancel: CancellationToken,
    ) -> RawEventStream;
}
