//! Tests for config functionality.

use crate::config::{Config, DEFAULT_CONFIG_PATH, LogLevel};
use crate::error::LatchkeyError;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.data_dir, ".latchkey/data");
    assert_eq!(config.table_name, "latchkey");
    assert_eq!(config.event_retention_days, 30);
    assert_eq!(config.lock_retry_delays_secs, vec![0, 1, 3, 6, 10]);
    assert_eq!(config.lock_timeout_secs, None);
    assert_eq!(config.bootstrap_poll_interval_ms, 1000);
    assert_eq!(config.bootstrap_max_polls, 60);
    assert_eq!(config.engine_lock_stale_seconds, 30);
    assert_eq!(config.engine_lock_spin_attempts, 200);
    assert_eq!(config.log_level, LogLevel::Warn);
    assert!(config.validate().is_ok());
}

#[test]
fn test_parse_empty_yaml() {
    let config = Config::from_yaml("").unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_parse_partial_yaml() {
    let yaml = r#"
table_name: locks-staging
lock_retry_delays_secs: [0, 2]
"#;
    let config = Config::from_yaml(yaml).unwrap();

    // Specified values should be used
    assert_eq!(config.table_name, "locks-staging");
    assert_eq!(config.lock_retry_delays_secs, vec![0, 2]);

    // Unspecified values should use defaults
    assert_eq!(config.data_dir, ".latchkey/data");
    assert_eq!(config.event_retention_days, 30);
}

#[test]
fn test_parse_full_yaml() {
    let yaml = r#"
data_dir: /var/lib/latchkey
table_name: locks
event_retention_days: 7
lock_retry_delays_secs: [1, 1, 1]
lock_timeout_secs: 15
bootstrap_poll_interval_ms: 250
bootstrap_max_polls: 8
engine_lock_stale_seconds: 90
engine_lock_spin_attempts: 50
log_level: debug
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.data_dir, "/var/lib/latchkey");
    assert_eq!(config.table_name, "locks");
    assert_eq!(config.event_retention_days, 7);
    assert_eq!(config.lock_timeout(), Some(Duration::from_secs(15)));
    assert_eq!(config.bootstrap_poll_interval(), Duration::from_millis(250));
    assert_eq!(config.bootstrap_max_polls, 8);
    assert_eq!(config.log_level, LogLevel::Debug);

    let schedule = config.retry_schedule().unwrap();
    assert_eq!(schedule.attempts(), 3);
    assert_eq!(schedule.total(), Duration::from_secs(3));

    let options = config.file_engine_options();
    assert_eq!(options.lock.stale_seconds, 90);
    assert_eq!(options.lock.spin_attempts, 50);
}

#[test]
fn test_unknown_fields_ignored() {
    let yaml = r#"
table_name: locks
some_future_option: true
nested_future:
  key: value
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.table_name, "locks");
}

#[test]
fn test_validation_rejects_empty_schedule() {
    let err = Config::from_yaml("lock_retry_delays_secs: []").unwrap_err();
    match err {
        LatchkeyError::UserError(msg) => assert!(msg.contains("lock_retry_delays_secs")),
        other => panic!("expected UserError, got {:?}", other),
    }
}

#[test]
fn test_validation_rejects_zero_values() {
    for field in [
        "event_retention_days",
        "bootstrap_poll_interval_ms",
        "bootstrap_max_polls",
        "engine_lock_stale_seconds",
        "engine_lock_spin_attempts",
        "lock_timeout_secs",
    ] {
        let err = Config::from_yaml(&format!("{}: 0", field)).unwrap_err();
        assert!(err.to_string().contains(field), "{}", field);
    }
}

#[test]
fn test_validation_rejects_empty_names() {
    assert!(Config::from_yaml("table_name: ''").is_err());
    assert!(Config::from_yaml("data_dir: '  '").is_err());
}

#[test]
fn test_invalid_yaml_is_user_error() {
    let err = Config::from_yaml("lock_retry_delays_secs: [oops").unwrap_err();
    assert!(matches!(err, LatchkeyError::UserError(_)));

    let err = Config::from_yaml("log_level: loud").unwrap_err();
    assert!(matches!(err, LatchkeyError::UserError(_)));
}

#[test]
fn test_yaml_roundtrip() {
    let config = Config {
        table_name: "locks".into(),
        lock_timeout_secs: Some(30),
        log_level: LogLevel::Info,
        ..Config::default()
    };
    let yaml = config.to_yaml().unwrap();
    assert_eq!(Config::from_yaml(&yaml).unwrap(), config);
}

#[test]
fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "table_name: from-file\n").unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.table_name, "from-file");
    assert_eq!(Config::load_or_default(&path).unwrap(), config);
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(DEFAULT_CONFIG_PATH);

    assert!(matches!(
        Config::load(&path).unwrap_err(),
        LatchkeyError::UserError(_)
    ));
    assert_eq!(Config::load_or_default(&path).unwrap(), Config::default());
}
