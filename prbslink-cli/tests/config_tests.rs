use std::fs;
use tempfile::tempdir;

use prbslink_cli::commands::config;
use prbslink_core::MonitorConfig;

#[test]
fn test_config_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("monitor.json");
    let path = path.to_str().unwrap();

    config::execute(path).unwrap();
    let loaded = config::load(Some(path)).unwrap();

    assert_eq!(loaded, MonitorConfig::default());
}

#[test]
fn test_partial_config_uses_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("partial.json");
    fs::write(&path, r#"{ "payload_len": 512, "gap_threshold": 9 }"#).unwrap();

    let loaded = config::load(Some(path.to_str().unwrap())).unwrap();

    assert_eq!(loaded.payload_len, 512);
    assert_eq!(loaded.gap_threshold, 9);
    assert_eq!(loaded.seed, MonitorConfig::default().seed);
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.json");
    fs::write(&path, r#"{ "seed": 0 }"#).unwrap();

    assert!(config::load(Some(path.to_str().unwrap())).is_err());
}

#[test]
fn test_missing_config_file() {
    assert!(config::load(Some("/nonexistent/monitor.json")).is_err());
}

#[test]
fn test_no_path_means_defaults() {
    assert_eq!(config::load(None).unwrap(), MonitorConfig::default());
}
