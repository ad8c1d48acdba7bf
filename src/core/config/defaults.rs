use std::time::Duration;

use crate::core::assembler::RunningToolPolicy;
use crate::core::config::data::Config;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_AGENT_PATH: &str = "agent/chat";
pub const DEFAULT_SESSIONS_PATH: &str = "sessions";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_STREAM_IDLE_TIMEOUT_SECS: u64 = 300;
pub const BASE_URL_ENV: &str = "AGENTDECK_BASE_URL";

/// Fully resolved settings used to build the transport and the conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub base_url: String,
    pub agent_path: String,
    pub sessions_path: String,
    pub enabled_tools: Vec<String>,
    pub running_tools_on_end: RunningToolPolicy,
    pub connect_timeout: Option<Duration>,
    pub stream_idle_timeout: Option<Duration>,
    pub log_filter: Option<String>,
}

/// Zero disables a timeout.
fn secs(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(value))
}

impl Config {
    /// Resolves the file values against the defaults. `env_base_url` wins
    /// over the file's `base_url`.
    pub fn resolve(&self, env_base_url: Option<String>) -> Settings {
        let base_url = env_base_url
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Settings {
            base_url,
            agent_path: self
                .agent_path
                .clone()
                .unwrap_or_else(|| DEFAULT_AGENT_PATH.to_string()),
            sessions_path: self
                .sessions_path
                .clone()
                .unwrap_or_else(|| DEFAULT_SESSIONS_PATH.to_string()),
            enabled_tools: self.enabled_tools.clone(),
            running_tools_on_end: self.running_tools_on_end.unwrap_or_default(),
            connect_timeout: secs(
                self.connect_timeout_secs
                    .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
            ),
            stream_idle_timeout: secs(
                self.stream_idle_timeout_secs
                    .unwrap_or(DEFAULT_STREAM_IDLE_TIMEOUT_SECS),
            ),
            log_filter: self.log_filter.clone(),
        }
    }

    /// Resolves using the process environment.
    pub fn resolve_from_env(&self) -> Settings {
        self.resolve(std::env::var(BASE_URL_ENV).ok())
    }
}
