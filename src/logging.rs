//! Developer trace records: request payloads, SSE frames that failed to
//! parse, and tool-process lifecycle. Records never reach the primary output.
//! They are appended to `AICHECK_LOG_PATH`, or to a temp file while stderr is
//! a terminal, and otherwise go to stderr.

use serde_json::Value;
use std::fs::OpenOptions;
use std::io::{IsTerminal, Write};

const DEFAULT_LOG_PATH: &str = "/tmp/aicheck-trace.log";
const LOG_PATH_ENV: &str = "AICHECK_LOG_PATH";
const DEBUG_PAYLOAD_ENV: &str = "AICHECK_DEBUG_PAYLOAD";
const DEBUG_TOOLS_ENV: &str = "AICHECK_DEBUG_TOOLS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolProcessEvent {
    Started,
    StartFailed,
    Released,
}

impl ToolProcessEvent {
    fn label(self) -> &'static str {
        match self {
            Self::Started => "tool_process_started",
            Self::StartFailed => "tool_process_start_failed",
            Self::Released => "tool_process_released",
        }
    }
}

/// Unset, empty or unrecognised values leave a flag off.
fn env_flag(key: &str) -> bool {
    std::env::var(key).is_ok_and(|value| {
        matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

pub fn debug_payload_enabled() -> bool {
    env_flag(DEBUG_PAYLOAD_ENV)
}

pub fn debug_tools_enabled() -> bool {
    env_flag(DEBUG_TOOLS_ENV)
}

pub fn emit_debug_payload(request_url: &str, payload: &Value) {
    let body = serde_json::to_string_pretty(payload)
        .unwrap_or_else(|_| "<payload serialization error>".to_string());
    write_record(&format!(
        "[aicheck] request_payload url={request_url}\n{body}\n"
    ));
}

pub fn emit_sse_parse_error(
    event_type: Option<&str>,
    json_data: &str,
    parse_error: &serde_json::Error,
) {
    write_record(&format!(
        "[aicheck] sse_parse_failed event={} error={parse_error}\n{json_data}\n",
        event_type.unwrap_or("<none>")
    ));
}

/// Record a tool-process transition. Off unless `AICHECK_DEBUG_TOOLS` is set.
pub fn emit_tool_process_record(event: ToolProcessEvent, command_line: &str, detail: &str) {
    if !debug_tools_enabled() {
        return;
    }
    write_record(&tool_process_line(event, command_line, detail));
}

fn tool_process_line(event: ToolProcessEvent, command_line: &str, detail: &str) -> String {
    if detail.is_empty() {
        format!("[aicheck] {} command=`{command_line}`\n", event.label())
    } else {
        format!(
            "[aicheck] {} command=`{command_line}` detail={detail}\n",
            event.label()
        )
    }
}

fn write_record(record: &str) {
    if let Some(path) = log_path() {
        let appended = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut file| file.write_all(record.as_bytes()));
        if appended.is_ok() {
            return;
        }
    }
    eprint!("{record}");
}

fn log_path() -> Option<String> {
    match std::env::var(LOG_PATH_ENV) {
        Ok(path) if !path.trim().is_empty() => Some(path.trim().to_string()),
        _ if std::io::stderr().is_terminal() => Some(DEFAULT_LOG_PATH.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_debug_flags_accept_true_variants() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        std::env::set_var(DEBUG_PAYLOAD_ENV, "1");
        assert!(debug_payload_enabled());
        std::env::set_var(DEBUG_PAYLOAD_ENV, "nope");
        assert!(!debug_payload_enabled());
        std::env::remove_var(DEBUG_PAYLOAD_ENV);

        std::env::set_var(DEBUG_TOOLS_ENV, " ON ");
        assert!(debug_tools_enabled());
        std::env::set_var(DEBUG_TOOLS_ENV, "0");
        assert!(!debug_tools_enabled());
        std::env::remove_var(DEBUG_TOOLS_ENV);
        assert!(!debug_tools_enabled());
    }

    #[test]
    fn test_records_are_appended_to_configured_path() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("trace.log");
        std::env::set_var(LOG_PATH_ENV, &path);
        std::env::set_var(DEBUG_TOOLS_ENV, "1");

        emit_debug_payload("https://api.example/v1/messages", &serde_json::json!({ "model": "m" }));
        emit_tool_process_record(ToolProcessEvent::Started, "uvx mcp-server-fetch", "");
        emit_tool_process_record(ToolProcessEvent::Released, "uvx", "Cancelled");
        std::env::remove_var(DEBUG_TOOLS_ENV);
        emit_tool_process_record(ToolProcessEvent::Started, "silent", "");
        std::env::remove_var(LOG_PATH_ENV);

        let written = std::fs::read_to_string(&path).expect("trace file");
        assert!(written.contains("request_payload"));
        assert!(written.contains("\"model\": \"m\""));
        assert!(written.contains("[aicheck] tool_process_started command=`uvx mcp-server-fetch`\n"));
        assert!(written.contains("tool_process_released command=`uvx` detail=Cancelled"));
        assert!(!written.contains("silent"));
    }
}
