//! One check run: validate the URL, start the fetch tool, stream the agent's
//! answer through the pump and shut the tool down again.

use crate::agent::{build_prompt, Agent, ModelAgent};
use crate::api::ApiClient;
use crate::config::Config;
use crate::debug_log::DebugLog;
use crate::error::SessionError;
use crate::mcp::StdioToolProvider;
use crate::pump::{PumpOutcome, StreamPump};
use crate::render::{RenderCommand, RenderSink};
use crate::tools::{Lifecycle, ManagedTools, ToolBinding, ToolProvider, ToolSet};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const EMPTY_URL_WARNING: &str = "URLを入力してください";
pub const INIT_FAILED_NOTICE: &str = "初期化に失敗しました";

const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);

pub struct Checker {
    agent: Arc<dyn Agent>,
    provider: Arc<dyn ToolProvider>,
    lifecycle: Lifecycle,
    binding: ToolBinding,
    tool_timeout: Duration,
    log: DebugLog,
}

impl Checker {
    pub fn new(agent: Arc<dyn Agent>, provider: Arc<dyn ToolProvider>, log: DebugLog) -> Self {
        Self {
            agent,
            provider,
            lifecycle: Lifecycle::default(),
            binding: ToolBinding::default(),
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            log,
        }
    }

    /// Wire the model client and the stdio tool server described by `config`.
    pub fn from_config(config: &Config, log: DebugLog) -> Result<Self> {
        let client = ApiClient::new(config)?;
        log.push(format!(
            "model {} at {}; tool command `{}`",
            client.model(),
            config.api_url,
            config.tool_command
        ));
        let agent = ModelAgent::new(
            client,
            config.system_prompt.clone(),
            config.max_tool_rounds,
            log.clone(),
        );
        let provider = StdioToolProvider::new(config.tool_command.clone(), config.tool_args.clone());

        Ok(Self::new(Arc::new(agent), Arc::new(provider), log)
            .with_lifecycle(config.lifecycle)
            .with_binding(config.binding)
            .with_tool_timeout(config.tool_timeout))
    }

    pub fn with_lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn with_binding(mut self, binding: ToolBinding) -> Self {
        self.binding = binding;
        self
    }

    pub fn with_tool_timeout(mut self, tool_timeout: Duration) -> Self {
        self.tool_timeout = tool_timeout;
        self
    }

    pub fn log(&self) -> &DebugLog {
        &self.log
    }

    /// Run one session for `url`, rendering into `sink`.
    ///
    /// An empty URL is rejected before anything is started. Once the tool
    /// process is up it is closed again on every exit path, and whatever was
    /// rendered before a failure stays in the sink.
    pub async fn check<S: RenderSink + ?Sized>(
        &self,
        url: &str,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<PumpOutcome, SessionError> {
        let url = url.trim();
        if url.is_empty() {
            sink.apply(RenderCommand::Warning(EMPTY_URL_WARNING.to_string()));
            return Err(SessionError::InputValidation);
        }
        self.log.push(format!("session start: {url} ({:?})", self.lifecycle));

        let tools = match ManagedTools::open(
            Arc::clone(&self.provider),
            self.lifecycle,
            self.binding,
            self.tool_timeout,
            self.log.clone(),
        )
        .await
        {
            Ok(tools) => Arc::new(tools),
            Err(error) => {
                self.log.push(format!("tool acquisition failed: {error}"));
                sink.apply(RenderCommand::Error(INIT_FAILED_NOTICE.to_string()));
                return Err(SessionError::ResourceAcquisition(error));
            }
        };

        let turn_cancel = cancel.child_token();
        // Also stops the producer if this future is dropped mid-stream.
        let _turn_guard = turn_cancel.clone().drop_guard();
        let tool_set: Arc<dyn ToolSet> = tools.clone();
        let events = self
            .agent
            .stream_respond(build_prompt(url), tool_set, turn_cancel.clone());
        let outcome = StreamPump::new(self.log.clone())
            .run(events, sink, cancel)
            .await;

        // Stop the producer before the tools go away under it.
        turn_cancel.cancel();
        tools.close().await;
        self.log.push(format!("session end: {outcome:?}"));

        match outcome {
            PumpOutcome::Completed => Ok(PumpOutcome::Completed),
            PumpOutcome::Failed(reason) => Err(SessionError::StreamTransport(reason)),
            PumpOutcome::Cancelled => Err(SessionError::Cancelled),
        }
    }
}
