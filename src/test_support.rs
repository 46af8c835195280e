use crate::error::ToolError;
use crate::tools::{ToolDefinition, ToolHandle, ToolProvider};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

/// Process-wide lock for tests that mutate environment variables.
/// Use `.blocking_lock()` in sync tests and `.lock().await` in async tests.
pub static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeBehavior {
    Echo,
    Fail,
    Hang,
}

#[derive(Default)]
struct Counters {
    acquired: AtomicUsize,
    released: AtomicUsize,
    calls: AtomicUsize,
}

/// In-memory tool process that counts acquisitions, releases and calls.
pub struct FakeProvider {
    tools: Vec<String>,
    behavior: FakeBehavior,
    fail_acquire: bool,
    counters: Arc<Counters>,
}

impl FakeProvider {
    pub fn new(tools: &[&str]) -> Self {
        Self {
            tools: tools.iter().map(|name| name.to_string()).collect(),
            behavior: FakeBehavior::Echo,
            fail_acquire: false,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn with_behavior(mut self, behavior: FakeBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn failing_acquire(mut self) -> Self {
        self.fail_acquire = true;
        self
    }

    pub fn acquired(&self) -> usize {
        self.counters.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.counters.released.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.counters.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolProvider for FakeProvider {
    async fn acquire(&self) -> Result<Box<dyn ToolHandle>, ToolError> {
        if self.fail_acquire {
            return Err(ToolError::Acquisition("fake spawn failure".to_string()));
        }
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeHandle {
            tools: self.tools.clone(),
            behavior: self.behavior,
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct FakeHandle {
    tools: Vec<String>,
    behavior: FakeBehavior,
    counters: Arc<Counters>,
}

#[async_trait]
impl ToolHandle for FakeHandle {
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ToolError> {
        Ok(self
            .tools
            .iter()
            .map(|name| ToolDefinition {
                name: name.clone(),
                description: format!("fake {name}"),
                input_schema: json!({ "type": "object" }),
            })
            .collect())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<String, ToolError> {
        self.counters.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            FakeBehavior::Echo => Ok(format!("{name}: {arguments}")),
            FakeBehavior::Fail => Err(ToolError::Invocation {
                name: name.to_string(),
                reason: "connection reset".to_string(),
            }),
            FakeBehavior::Hang => {
                std::future::pending::<()>().await;
                Ok(String::new())
            }
        }
    }

    async fn release(self: Box<Self>) {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
    }
}
