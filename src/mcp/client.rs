use crate::error::ToolError;
use crate::logging::{emit_tool_process_record, ToolProcessEvent};
use crate::tools::{ToolDefinition, ToolHandle, ToolProvider};
use async_trait::async_trait;
use rmcp::model::{CallToolRequestParam, ClientInfo, Tool};
use rmcp::service::RunningService;
use rmcp::transport::TokioChildProcess;
use rmcp::{RoleClient, ServiceExt};
use serde_json::Value;
use std::borrow::Cow;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

const INITIALIZE_TIMEOUT: Duration = Duration::from_secs(120);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Launches a tool server as a child process speaking MCP over stdio.
#[derive(Debug, Clone)]
pub struct StdioToolProvider {
    command: String,
    args: Vec<String>,
}

impl StdioToolProvider {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl ToolProvider for StdioToolProvider {
    async fn acquire(&self) -> Result<Box<dyn ToolHandle>, ToolError> {
        let command_line = self.command_line();
        match McpClient::spawn(&self.command, &self.args).await {
            Ok(client) => {
                emit_tool_process_record(ToolProcessEvent::Started, &command_line, "");
                Ok(Box::new(client))
            }
            Err(error) => {
                emit_tool_process_record(
                    ToolProcessEvent::StartFailed,
                    &command_line,
                    &error.to_string(),
                );
                Err(error)
            }
        }
    }
}

fn client_info() -> ClientInfo {
    let mut info = ClientInfo::default();
    info.client_info.name = env!("CARGO_PKG_NAME").to_string();
    info.client_info.version = env!("CARGO_PKG_VERSION").to_string();
    info
}

/// One running tool server. Server-initiated requests such as `ping` are
/// answered by the service task while calls are in flight.
pub struct McpClient {
    service: RunningService<RoleClient, ClientInfo>,
    command: String,
}

impl McpClient {
    pub async fn spawn(command: &str, args: &[String]) -> Result<Self, ToolError> {
        let mut cmd = Command::new(command);
        cmd.args(args).stderr(Stdio::null());
        let transport = TokioChildProcess::new(cmd).map_err(|error| {
            ToolError::Acquisition(format!("failed to start `{command}`: {error}"))
        })?;

        let service = match tokio::time::timeout(INITIALIZE_TIMEOUT, client_info().serve(transport))
            .await
        {
            Ok(Ok(service)) => service,
            Ok(Err(error)) => {
                return Err(ToolError::Acquisition(format!(
                    "handshake with `{command}` failed: {error}"
                )))
            }
            Err(_) => {
                return Err(ToolError::Acquisition(format!(
                    "handshake with `{command}` timed out after {}s",
                    INITIALIZE_TIMEOUT.as_secs()
                )))
            }
        };

        Ok(Self {
            service,
            command: command.to_string(),
        })
    }
}

fn definition(tool: Tool) -> ToolDefinition {
    ToolDefinition {
        name: tool.name.to_string(),
        description: tool
            .description
            .map(|description| description.to_string())
            .unwrap_or_default(),
        input_schema: Value::Object(tool.input_schema.as_ref().clone()),
    }
}

/// Text items of a tool result, joined by newlines. Other content kinds
/// (images, resources) are dropped.
fn content_text(content: &Value) -> String {
    content
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter(|item| item["type"] == "text")
                .filter_map(|item| item["text"].as_str())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

#[async_trait]
impl ToolHandle for McpClient {
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ToolError> {
        let tools = self
            .service
            .list_all_tools()
            .await
            .map_err(|error| ToolError::Transport(format!("tools/list failed: {error}")))?;
        Ok(tools.into_iter().map(definition).collect())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<String, ToolError> {
        let invocation_error = |reason: String| ToolError::Invocation {
            name: name.to_string(),
            reason,
        };

        let result = self
            .service
            .call_tool(CallToolRequestParam {
                name: Cow::Owned(name.to_string()),
                arguments: match arguments {
                    Value::Object(arguments) => Some(arguments),
                    _ => None,
                },
            })
            .await
            .map_err(|error| invocation_error(error.to_string()))?;

        let content = serde_json::to_value(&result.content)
            .map_err(|error| invocation_error(format!("malformed result: {error}")))?;
        let text = content_text(&content);

        if result.is_error.unwrap_or_default() {
            return Err(invocation_error(if text.is_empty() {
                "tool reported an error".to_string()
            } else {
                text
            }));
        }
        Ok(text)
    }

    async fn release(self: Box<Self>) {
        let this = *self;
        // Cancelling closes the transport; the child is killed when dropped.
        let detail = match tokio::time::timeout(SHUTDOWN_GRACE, this.service.cancel()).await {
            Ok(Ok(reason)) => format!("{reason:?}"),
            Ok(Err(error)) => format!("service task failed: {error}"),
            Err(_) => "shutdown timed out".to_string(),
        };
        emit_tool_process_record(ToolProcessEvent::Released, &this.command, &detail);
    }
}
