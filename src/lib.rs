pub mod agent;
pub mod api;
pub mod config;
pub mod debug_log;
pub mod error;
pub mod logging;
pub mod mcp;
pub mod pump;
pub mod render;
pub mod session;
pub mod tools;
pub mod types;
pub mod util;

#[cfg(test)]
mod test_support;
