//! Key-based access used by `agentdeck config set|unset|show`.

use crate::core::assembler::RunningToolPolicy;
use crate::core::config::data::Config;
use crate::core::config::io::ConfigError;

pub const KEYS: &[&str] = &[
    "base_url",
    "agent_path",
    "sessions_path",
    "enabled_tools",
    "running_tools_on_end",
    "connect_timeout_secs",
    "stream_idle_timeout_secs",
    "log_filter",
];

/// Accepts `base-url` as well as `base_url`.
fn normalize_key(key: &str) -> Result<&'static str, ConfigError> {
    let normalized = key.trim().to_ascii_lowercase().replace('-', "_");
    KEYS.iter()
        .copied()
        .find(|known| *known == normalized)
        .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))
}

fn parse_secs(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|err| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: err.to_string(),
        })
}

fn non_empty(key: &str, value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: "value must not be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

impl Config {
    /// Sets `key` from its command-line representation. Returns the
    /// canonical key name.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<&'static str, ConfigError> {
        let key = normalize_key(key)?;
        match key {
            "base_url" => self.base_url = Some(non_empty(key, value)?),
            "agent_path" => self.agent_path = Some(non_empty(key, value)?),
            "sessions_path" => self.sessions_path = Some(non_empty(key, value)?),
            "enabled_tools" => {
                self.enabled_tools = value
                    .split(',')
                    .map(str::trim)
                    .filter(|tool| !tool.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            "running_tools_on_end" => {
                let policy = value.parse::<RunningToolPolicy>().map_err(|reason| {
                    ConfigError::InvalidValue {
                        key: key.to_string(),
                        value: value.to_string(),
                        reason,
                    }
                })?;
                self.running_tools_on_end = Some(policy);
            }
            "connect_timeout_secs" => self.connect_timeout_secs = Some(parse_secs(key, value)?),
            "stream_idle_timeout_secs" => {
                self.stream_idle_timeout_secs = Some(parse_secs(key, value)?)
            }
            "log_filter" => self.log_filter = Some(non_empty(key, value)?),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(key)
    }

    pub fn unset_value(&mut self, key: &str) -> Result<&'static str, ConfigError> {
        let key = normalize_key(key)?;
        match key {
            "base_url" => self.base_url = None,
            "agent_path" => self.agent_path = None,
            "sessions_path" => self.sessions_path = None,
            "enabled_tools" => self.enabled_tools.clear(),
            "running_tools_on_end" => self.running_tools_on_end = None,
            "connect_timeout_secs" => self.connect_timeout_secs = None,
            "stream_idle_timeout_secs" => self.stream_idle_timeout_secs = None,
            "log_filter" => self.log_filter = None,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(key)
    }

    /// Value of `key` as written by `set_value`, or `None` when unset.
    pub fn display_value(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let key = normalize_key(key)?;
        let value = match key {
            "base_url" => self.base_url.clone(),
            "agent_path" => self.agent_path.clone(),
            "sessions_path" => self.sessions_path.clone(),
            "enabled_tools" => {
                (!self.enabled_tools.is_empty()).then(|| self.enabled_tools.join(","))
            }
            "running_tools_on_end" => self.running_tools_on_end.map(|p| p.as_str().to_string()),
            "connect_timeout_secs" => self.connect_timeout_secs.map(|v| v.to_string()),
            "stream_idle_timeout_secs" => self.stream_idle_timeout_secs.map(|v| v.to_string()),
            "log_filter" => self.log_filter.clone(),
            _ => None,
        };
        Ok(value)
    }
}
