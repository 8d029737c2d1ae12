//! Tests for configuration resolution and graceful degradation
//!
//! Uses serial_test to prevent ENV variable race conditions: tests that
//! touch APT_* variables are marked #[serial].

use apt_common::config::{
    load_toml_config, resolve_ai_api_key, resolve_config_path, resolve_database_path, TomlConfig,
    AI_API_KEY_ENV_VAR, CONFIG_ENV_VAR, DATABASE_ENV_VAR,
};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn test_missing_config_file_falls_back_to_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("does-not-exist.toml");

    let config = load_toml_config(Some(&missing)).unwrap();
    assert_eq!(config.batch.sub_batch_size, 8);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_no_config_path_falls_back_to_defaults() {
    let config = load_toml_config(None).unwrap();
    assert_eq!(config.batch.confidence_threshold, 60);
}

#[test]
fn test_malformed_config_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "[batch\nlimit = ").unwrap();

    let err = load_toml_config(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("Parse TOML failed"));
}

#[test]
fn test_config_file_values_are_loaded() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        database_path = "/var/lib/apt/test.db"

        [logging]
        level = "debug"

        [batch]
        sub_batch_size = 4
        pause_between_sub_batches_ms = 0

        [ai]
        enabled = false
        "#,
    )
    .unwrap();

    let config = load_toml_config(Some(&path)).unwrap();
    assert_eq!(config.database_path.as_deref(), Some("/var/lib/apt/test.db"));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.batch.sub_batch_size, 4);
    assert_eq!(config.batch.pause_between_sub_batches_ms, 0);
    assert!(!config.ai.enabled);
    // untouched sections keep their defaults
    assert!(config.enrichment.enabled);
}

#[test]
#[serial]
fn test_config_path_from_env() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/apt-env-config.toml");
    let path = resolve_config_path(None);
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(path, Some(PathBuf::from("/tmp/apt-env-config.toml")));
}

#[test]
#[serial]
fn test_cli_config_path_beats_env() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/apt-env-config.toml");
    let path = resolve_config_path(Some(Path::new("/tmp/apt-cli-config.toml")));
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(path, Some(PathBuf::from("/tmp/apt-cli-config.toml")));
}

#[test]
#[serial]
fn test_database_path_priority() {
    let mut config = TomlConfig::default();
    config.database_path = Some("/tmp/apt-toml.db".to_string());

    env::remove_var(DATABASE_ENV_VAR);
    assert_eq!(
        resolve_database_path(None, &config),
        PathBuf::from("/tmp/apt-toml.db")
    );

    env::set_var(DATABASE_ENV_VAR, "/tmp/apt-env.db");
    assert_eq!(
        resolve_database_path(None, &config),
        PathBuf::from("/tmp/apt-env.db")
    );
    env::remove_var(DATABASE_ENV_VAR);

    let fallback = resolve_database_path(None, &TomlConfig::default());
    assert!(fallback.ends_with("apt.db"));
}

#[test]
#[serial]
fn test_ai_api_key_env_beats_toml() {
    let mut config = TomlConfig::default();
    config.ai.api_key = Some("toml-key".to_string());

    env::set_var(AI_API_KEY_ENV_VAR, "env-key");
    assert_eq!(resolve_ai_api_key(&config).as_deref(), Some("env-key"));

    env::set_var(AI_API_KEY_ENV_VAR, "   ");
    assert_eq!(resolve_ai_api_key(&config).as_deref(), Some("toml-key"));

    env::remove_var(AI_API_KEY_ENV_VAR);
    assert_eq!(resolve_ai_api_key(&TomlConfig::default()), None);
}
