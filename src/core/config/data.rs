use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::assembler::RunningToolPolicy;

/// On-disk configuration. Every key is optional; unset keys fall back to
/// the defaults in [`super::defaults`].
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    pub base_url: Option<String>,
    pub agent_path: Option<String>,
    pub sessions_path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enabled_tools: Vec<String>,
    pub running_tools_on_end: Option<RunningToolPolicy>,
    pub connect_timeout_secs: Option<u64>,
    pub stream_idle_timeout_secs: Option<u64>,
    pub log_filter: Option<String>,
}

/// Display a path with `~` standing in for the home directory.
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
