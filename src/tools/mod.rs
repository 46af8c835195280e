//! Tool capabilities offered to the agent and the lifecycle of the process
//! that backs them.

mod fetch;
mod lifecycle;

pub use fetch::{fetch_definition, FETCH_TOOL_NAME};
pub use lifecycle::{Lifecycle, ManagedTools, ToolBinding};

use crate::error::ToolError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub input_schema: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub content: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// The set of tools an agent may call during one response.
///
/// `invoke` never fails: failures come back as an error-flagged output so the
/// agent can report them instead of the stream aborting.
#[async_trait]
pub trait ToolSet: Send + Sync {
    fn definitions(&self) -> Vec<ToolDefinition>;
    async fn invoke(&self, name: &str, input: Value) -> ToolOutput;
}

/// Starts the external tool process.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    async fn acquire(&self) -> Result<Box<dyn ToolHandle>, ToolError>;
}

/// A live tool process. Dropping a handle without `release` must still stop
/// the process.
#[async_trait]
pub trait ToolHandle: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ToolError>;
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<String, ToolError>;
    async fn release(self: Box<Self>);
}
