use super::data::Config;
use super::defaults::{DEFAULT_AGENT_PATH, DEFAULT_BASE_URL, DEFAULT_SESSIONS_PATH};
use super::io::ConfigError;
use crate::core::assembler::RunningToolPolicy;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_load_nonexistent_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nonexistent_config.toml");

    let config = Config::load_from_path(&config_path).expect("Failed to load config");
    assert_eq!(config, Config::default());
}

#[test]
fn test_config_persistence_lifecycle() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config
        .set_value("base-url", "https://agents.example.com/api")
        .expect("set base_url");
    config
        .set_value("enabled_tools", "filesystem, github,,")
        .expect("set tools");
    config
        .set_value("running_tools_on_end", "strict")
        .expect("set policy");
    config.save_to_path(&config_path).expect("save");

    let loaded = Config::load_from_path(&config_path).expect("load");
    assert_eq!(
        loaded.base_url.as_deref(),
        Some("https://agents.example.com/api")
    );
    assert_eq!(loaded.enabled_tools, vec!["filesystem", "github"]);
    assert_eq!(loaded.running_tools_on_end, Some(RunningToolPolicy::Fail));

    let mut loaded = loaded;
    loaded.unset_value("base_url").expect("unset");
    loaded.unset_value("enabled-tools").expect("unset");
    loaded.save_to_path(&config_path).expect("save again");

    let reloaded = Config::load_from_path(&config_path).expect("reload");
    assert!(reloaded.base_url.is_none());
    assert!(reloaded.enabled_tools.is_empty());
    assert_eq!(reloaded.running_tools_on_end, Some(RunningToolPolicy::Fail));
}

#[test]
fn policy_is_written_with_its_wire_name() {
    let config = Config {
        running_tools_on_end: Some(RunningToolPolicy::Fail),
        ..Default::default()
    };
    let toml = toml::to_string_pretty(&config).expect("serialize");
    assert!(toml.contains("running_tools_on_end = \"error\""));
}

#[test]
fn invalid_toml_reports_parse_error_with_path() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "base_url = [").expect("write");

    match Config::load_from_path(&config_path) {
        Err(err @ ConfigError::Parse { .. }) => {
            assert!(err.to_string().starts_with("Failed to parse config at"));
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn resolve_applies_defaults() {
    let settings = Config::default().resolve(None);
    assert_eq!(settings.base_url, DEFAULT_BASE_URL);
    assert_eq!(settings.agent_path, DEFAULT_AGENT_PATH);
    assert_eq!(settings.sessions_path, DEFAULT_SESSIONS_PATH);
    assert_eq!(settings.running_tools_on_end, RunningToolPolicy::Complete);
    assert_eq!(settings.connect_timeout, Some(Duration::from_secs(10)));
    assert_eq!(settings.stream_idle_timeout, Some(Duration::from_secs(300)));
}

#[test]
fn resolve_prefers_environment_base_url_and_zero_disables_timeouts() {
    let config = Config {
        base_url: Some("http://file.example/api".into()),
        stream_idle_timeout_secs: Some(0),
        ..Default::default()
    };

    let settings = config.resolve(Some("http://env.example/api".into()));
    assert_eq!(settings.base_url, "http://env.example/api");
    assert_eq!(settings.stream_idle_timeout, None);

    let settings = config.resolve(Some("   ".into()));
    assert_eq!(settings.base_url, "http://file.example/api");
}

#[test]
fn set_value_rejects_unknown_keys_and_bad_values() {
    let mut config = Config::default();
    assert!(matches!(
        config.set_value("theme", "dark"),
        Err(ConfigError::UnknownKey(_))
    ));
    assert!(matches!(
        config.set_value("connect_timeout_secs", "soon"),
        Err(ConfigError::InvalidValue { .. })
    ));
    assert!(matches!(
        config.set_value("running_tools_on_end", "maybe"),
        Err(ConfigError::InvalidValue { .. })
    ));
    assert!(matches!(
        config.set_value("agent_path", "  "),
        Err(ConfigError::InvalidValue { .. })
    ));
    assert_eq!(config, Config::default());
}

#[test]
fn display_value_round_trips_set_values() {
    let mut config = Config::default();
    assert_eq!(config.display_value("log_filter").expect("key"), None);
    config
        .set_value("stream-idle-timeout-secs", "45")
        .expect("set");
    assert_eq!(
        config
            .display_value("stream_idle_timeout_secs")
            .expect("key")
            .as_deref(),
        Some("45")
    );
}
