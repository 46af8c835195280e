use thiserror::Error;

/// Failures at the tool-process boundary.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool process unavailable: {0}")]
    Acquisition(String),
    #[error("tool `{0}` not found")]
    NotFound(String),
    #[error("tool `{name}` failed: {reason}")]
    Invocation { name: String, reason: String },
    #[error("tool `{name}` timed out after {secs}s")]
    Timeout { name: String, secs: u64 },
    #[error("tool process transport error: {0}")]
    Transport(String),
    #[error("tool process already released")]
    Released,
}

/// Terminal outcomes of a check session other than success.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no URL was supplied")]
    InputValidation,
    #[error("failed to initialize the fetch tool: {0}")]
    ResourceAcquisition(#[source] ToolError),
    #[error("response stream failed: {0}")]
    StreamTransport(String),
    #[error("session cancelled")]
    Cancelled,
}
