use super::{fetch_definition, ToolDefinition, ToolHandle, ToolOutput, ToolProvider, ToolSet};
use super::FETCH_TOOL_NAME;
use crate::debug_log::DebugLog;
use crate::error::ToolError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// How long an acquired tool process is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Lifecycle {
    /// Acquire, call once, release.
    PerCall,
    /// Hold one process for the whole session.
    #[default]
    PerSession,
}

impl Lifecycle {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "per-call" | "call" => Some(Self::PerCall),
            "per-session" | "session" => Some(Self::PerSession),
            _ => None,
        }
    }
}

/// Which tool list the agent sees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ToolBinding {
    /// Every tool the process enumerates.
    #[default]
    Native,
    /// A single hand-written `fetch(url)` tool forwarded to the process.
    Wrapped,
}

impl ToolBinding {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "native" | "mcp" => Some(Self::Native),
            "wrapped" | "fetch" => Some(Self::Wrapped),
            _ => None,
        }
    }
}

/// Tool process guarded by a [`Lifecycle`] policy.
///
/// The process is never called outside an acquired window: per-call
/// invocations acquire and release around each call, per-session invocations
/// share one handle behind a lock until [`ManagedTools::close`]. After close
/// every invocation returns an error output without touching a process.
pub struct ManagedTools {
    provider: Arc<dyn ToolProvider>,
    lifecycle: Lifecycle,
    binding: ToolBinding,
    timeout: Duration,
    available: Vec<ToolDefinition>,
    held: Mutex<Option<Box<dyn ToolHandle>>>,
    closed: AtomicBool,
    log: DebugLog,
}

impl ManagedTools {
    /// Acquire the process and enumerate its tools. Failing to start it, to
    /// list its tools, or getting an empty list is an acquisition error.
    pub async fn open(
        provider: Arc<dyn ToolProvider>,
        lifecycle: Lifecycle,
        binding: ToolBinding,
        timeout: Duration,
        log: DebugLog,
    ) -> Result<Self, ToolError> {
        let handle = provider.acquire().await?;
        log.push("tool process acquired");

        let available = match handle.list_tools().await {
            Ok(tools) if !tools.is_empty() => tools,
            Ok(_) => {
                handle.release().await;
                log.push("tool process released: empty tool list");
                return Err(ToolError::Acquisition(
                    "tool process reported no tools".to_string(),
                ));
            }
            Err(error) => {
                handle.release().await;
                log.push(format!("tool process released: list failed: {error}"));
                return Err(ToolError::Acquisition(format!(
                    "failed to list tools: {error}"
                )));
            }
        };
        log.push(format!(
            "tools available: {}",
            available
                .iter()
                .map(|tool| tool.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ));

        let held = match lifecycle {
            Lifecycle::PerSession => Some(handle),
            Lifecycle::PerCall => {
                handle.release().await;
                log.push("tool process released after listing");
                None
            }
        };

        Ok(Self {
            provider,
            lifecycle,
            binding,
            timeout,
            available,
            held: Mutex::new(held),
            closed: AtomicBool::new(false),
            log,
        })
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn available(&self) -> &[ToolDefinition] {
        &self.available
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Release the held process, if any. Idempotent.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let handle = self.held.lock().await.take();
        if let Some(handle) = handle {
            handle.release().await;
            self.log.push("tool process released at session end");
        }
    }

    fn resolve_target<'a>(&self, name: &'a str) -> Result<&'a str, ToolError> {
        if self.binding == ToolBinding::Wrapped && name != FETCH_TOOL_NAME {
            return Err(ToolError::NotFound(name.to_string()));
        }
        if self.available.iter().any(|tool| tool.name == name) {
            Ok(name)
        } else {
            Err(ToolError::NotFound(name.to_string()))
        }
    }

    async fn call(&self, name: &str, input: Value) -> Result<String, ToolError> {
        let mut held = self.held.lock().await;
        if self.is_closed() {
            return Err(ToolError::Released);
        }

        match self.lifecycle {
            Lifecycle::PerSession => {
                if held.is_none() {
                    *held = Some(self.provider.acquire().await?);
                    self.log.push("tool process re-acquired");
                }
                let handle = held.as_ref().ok_or(ToolError::Released)?;
                let result = tokio::time::timeout(self.timeout, handle.call_tool(name, input)).await;
                match result {
                    Ok(result) => result,
                    Err(_) => {
                        // The process may still answer the abandoned request.
                        if let Some(handle) = held.take() {
                            handle.release().await;
                        }
                        self.log.push(format!("tool process released after `{name}` timed out"));
                        Err(self.timeout_error(name))
                    }
                }
            }
            Lifecycle::PerCall => {
                let handle = self.provider.acquire().await?;
                let result = tokio::time::timeout(self.timeout, handle.call_tool(name, input)).await;
                handle.release().await;
                result.unwrap_or_else(|_| Err(self.timeout_error(name)))
            }
        }
    }

    fn timeout_error(&self, name: &str) -> ToolError {
        ToolError::Timeout {
            name: name.to_string(),
            secs: self.timeout.as_secs(),
        }
    }
}

#[async_trait]
impl ToolSet for ManagedTools {
    fn definitions(&self) -> Vec<ToolDefinition> {
        match self.binding {
            ToolBinding::Native => self.available.clone(),
            ToolBinding::Wrapped => vec![fetch_definition()],
        }
    }

    async fn invoke(&self, name: &str, input: Value) -> ToolOutput {
        let result = match self.resolve_target(name) {
            Ok(target) => self.call(target, input).await,
            Err(error) => Err(error),
        };

        match result {
            Ok(content) => {
                self.log
                    .push(format!("tool `{name}` returned {} chars", content.chars().count()));
                ToolOutput::ok(content)
            }
            Err(error) => {
                self.log.push(format!("tool `{name}` error: {error}"));
                ToolOutput::error(error.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeBehavior, FakeProvider};
    use serde_json::json;

    async fn open(
        provider: &Arc<FakeProvider>,
        lifecycle: Lifecycle,
        binding: ToolBinding,
    ) -> ManagedTools {
        ManagedTools::open(
            provider.clone(),
            lifecycle,
            binding,
            Duration::from_secs(5),
            DebugLog::default(),
        )
        .await
        .expect("tools should open")
    }

    #[tokio::test]
    async fn test_per_session_reuses_one_process() {
        let provider = Arc::new(FakeProvider::new(&["fetch"]));
        let tools = open(&provider, Lifecycle::PerSession, ToolBinding::Native).await;

        for _ in 0..3 {
            let output = tools.invoke("fetch", json!({ "url": "https://example.com" })).await;
            assert!(!output.is_error, "{}", output.content);
        }
        tools.close().await;

        assert_eq!(provider.acquired(), 1);
        assert_eq!(provider.released(), 1);
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_per_call_acquires_and_releases_each_invocation() {
        let provider = Arc::new(FakeProvider::new(&["fetch"]));
        let tools = open(&provider, Lifecycle::PerCall, ToolBinding::Native).await;
        assert_eq!(provider.acquired(), 1);
        assert_eq!(provider.released(), 1);

        tools.invoke("fetch", json!({ "url": "https://a.example" })).await;
        tools.invoke("fetch", json!({ "url": "https://b.example" })).await;
        tools.close().await;

        assert_eq!(provider.acquired(), 3);
        assert_eq!(provider.released(), 3);
    }

    #[tokio::test]
    async fn test_missing_tool_returns_not_found_text() {
        let provider = Arc::new(FakeProvider::new(&["search"]));
        let tools = open(&provider, Lifecycle::PerSession, ToolBinding::Wrapped).await;

        let output = tools.invoke("fetch", json!({ "url": "https://example.com" })).await;

        assert!(output.is_error);
        assert_eq!(output.content, "tool `fetch` not found");
        assert_eq!(provider.calls(), 0);
        tools.close().await;
    }

    #[tokio::test]
    async fn test_invocation_failure_is_contained_as_text() {
        let provider = Arc::new(FakeProvider::new(&["fetch"]).with_behavior(FakeBehavior::Fail));
        let tools = open(&provider, Lifecycle::PerSession, ToolBinding::Native).await;

        let output = tools.invoke("fetch", json!({ "url": "https://example.com" })).await;

        assert!(output.is_error);
        assert!(!output.content.is_empty());
        assert!(output.content.contains("fetch"));
        tools.close().await;
    }

    #[tokio::test]
    async fn test_timeout_releases_session_handle_and_reacquires() {
        let provider = Arc::new(FakeProvider::new(&["fetch"]).with_behavior(FakeBehavior::Hang));
        let tools = ManagedTools::open(
            provider.clone(),
            Lifecycle::PerSession,
            ToolBinding::Native,
            Duration::from_millis(20),
            DebugLog::default(),
        )
        .await
        .expect("tools should open");

        let output = tools.invoke("fetch", json!({ "url": "https://example.com" })).await;
        assert!(output.is_error);
        assert!(output.content.contains("timed out"));
        assert_eq!(provider.released(), 1);

        tools.invoke("fetch", json!({ "url": "https://example.com" })).await;
        assert_eq!(provider.acquired(), 2);
        tools.close().await;
        assert_eq!(provider.released(), 2);
    }

    #[tokio::test]
    async fn test_invoke_after_close_never_touches_process() {
        let provider = Arc::new(FakeProvider::new(&["fetch"]));
        let tools = open(&provider, Lifecycle::PerCall, ToolBinding::Native).await;
        tools.close().await;

        let output = tools.invoke("fetch", json!({ "url": "https://example.com" })).await;

        assert!(output.is_error);
        assert_eq!(output.content, "tool process already released");
        assert_eq!(provider.acquired(), 1);
    }

    #[tokio::test]
    async fn test_empty_tool_list_is_acquisition_error() {
        let provider = Arc::new(FakeProvider::new(&[]));
        let result = ManagedTools::open(
            provider.clone(),
            Lifecycle::PerSession,
            ToolBinding::Native,
            Duration::from_secs(1),
            DebugLog::default(),
        )
        .await;

        assert!(matches!(result, Err(ToolError::Acquisition(_))));
        assert_eq!(provider.released(), 1);
    }

    #[tokio::test]
    async fn test_wrapped_binding_exposes_single_fetch_definition() {
        let provider = Arc::new(FakeProvider::new(&["fetch", "search"]));
        let tools = open(&provider, Lifecycle::PerSession, ToolBinding::Wrapped).await;

        let names: Vec<String> = tools.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["fetch"]);

        let output = tools.invoke("search", json!({})).await;
        assert_eq!(output.content, "tool `search` not found");
        tools.close().await;
    }

    #[test]
    fn test_lifecycle_and_binding_parse() {
        assert_eq!(Lifecycle::parse("per-call"), Some(Lifecycle::PerCall));
        assert_eq!(Lifecycle::parse("PER_SESSION"), Some(Lifecycle::PerSession));
        assert_eq!(Lifecycle::parse("forever"), None);
        assert_eq!(ToolBinding::parse("wrapped"), Some(ToolBinding::Wrapped));
        assert_eq!(ToolBinding::parse(" Native "), Some(ToolBinding::Native));
    }
}
