use crate::agent::DEFAULT_SYSTEM_PROMPT;
use crate::debug_log::DEFAULT_DEBUG_LOG_CAPACITY;
use crate::tools::{Lifecycle, ToolBinding};
use crate::util::is_local_endpoint_url;
use anyhow::{bail, Result};
use std::time::Duration;

const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_MODEL: &str = "claude-opus-4-20250514";
const DEFAULT_ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_TOOL_COMMAND: &str = "uvx";
const DEFAULT_TOOL_ARGS: &str = "mcp-server-fetch --ignore-robots-txt";
const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;
const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: String,
    pub api_url: String,
    pub anthropic_version: String,
    pub max_tokens: u32,
    pub system_prompt: String,
    pub tool_command: String,
    pub tool_args: Vec<String>,
    pub lifecycle: Lifecycle,
    pub binding: ToolBinding,
    pub tool_timeout: Duration,
    pub max_tool_rounds: usize,
    pub debug_log_capacity: usize,
}

impl Config {
    /// Defaults for every field, pointed at `api_url`, with no credentials.
    pub fn for_endpoint(api_url: impl Into<String>) -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_url: api_url.into(),
            anthropic_version: DEFAULT_ANTHROPIC_VERSION.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            tool_command: DEFAULT_TOOL_COMMAND.to_string(),
            tool_args: split_args(DEFAULT_TOOL_ARGS),
            lifecycle: Lifecycle::default(),
            binding: ToolBinding::default(),
            tool_timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            debug_log_capacity: DEFAULT_DEBUG_LOG_CAPACITY,
        }
    }

    pub fn load() -> Result<Self> {
        let mut config = Self::for_endpoint(
            env_string("ANTHROPIC_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        );

        config.api_key = env_string("ANTHROPIC_API_KEY");
        if let Some(model) = env_string("ANTHROPIC_MODEL") {
            config.model = model;
        }
        if let Some(version) = env_string("ANTHROPIC_VERSION") {
            config.anthropic_version = version;
        }
        if let Some(max_tokens) = env_parse::<u32>("AICHECK_MAX_TOKENS")? {
            config.max_tokens = max_tokens.clamp(256, 32_000);
        }
        if let Some(prompt) = env_string("AICHECK_SYSTEM_PROMPT") {
            config.system_prompt = prompt;
        }
        if let Some(command) = env_string("AICHECK_TOOL_COMMAND") {
            config.tool_command = command;
        }
        if let Ok(args) = std::env::var("AICHECK_TOOL_ARGS") {
            config.tool_args = split_args(&args);
        }
        if let Some(value) = env_string("AICHECK_TOOL_LIFECYCLE") {
            config.lifecycle = match Lifecycle::parse(&value) {
                Some(lifecycle) => lifecycle,
                None => bail!(
                    "Invalid AICHECK_TOOL_LIFECYCLE '{value}': expected per-call or per-session"
                ),
            };
        }
        if let Some(value) = env_string("AICHECK_TOOL_BINDING") {
            config.binding = match ToolBinding::parse(&value) {
                Some(binding) => binding,
                None => bail!("Invalid AICHECK_TOOL_BINDING '{value}': expected native or wrapped"),
            };
        }
        if let Some(secs) = env_parse::<u64>("AICHECK_TOOL_TIMEOUT_SECS")? {
            config.tool_timeout = Duration::from_secs(secs);
        }
        if let Some(rounds) = env_parse::<usize>("AICHECK_MAX_TOOL_ROUNDS")? {
            config.max_tool_rounds = rounds;
        }
        if let Some(capacity) = env_parse::<usize>("AICHECK_DEBUG_LOG_CAPACITY")? {
            config.debug_log_capacity = capacity;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            bail!(
                "Invalid ANTHROPIC_API_URL '{}': expected http:// or https:// URL",
                self.api_url
            );
        }

        if !self.is_local_endpoint() && self.api_key.is_none() {
            bail!(
                "ANTHROPIC_API_KEY must be set for non-local endpoints (url: '{}')",
                self.api_url
            );
        }

        if self.model.trim().is_empty() {
            bail!("ANTHROPIC_MODEL must not be empty");
        }

        if self.tool_command.trim().is_empty() {
            bail!("AICHECK_TOOL_COMMAND must not be empty");
        }

        if self.tool_timeout.is_zero() {
            bail!("AICHECK_TOOL_TIMEOUT_SECS must be greater than zero");
        }

        if self.max_tool_rounds == 0 {
            bail!("AICHECK_MAX_TOOL_ROUNDS must be greater than zero");
        }

        Ok(())
    }

    fn is_local_endpoint(&self) -> bool {
        is_local_endpoint_url(&self.api_url)
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match env_string(key) {
        Some(value) => match value.parse::<T>() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => bail!("Invalid {key} '{value}': expected a non-negative integer"),
        },
        None => Ok(None),
    }
}

fn split_args(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}
