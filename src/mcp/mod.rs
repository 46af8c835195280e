//! Stdio MCP tool server client.

mod client;

pub use client::{McpClient, StdioToolProvider};
