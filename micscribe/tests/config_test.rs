//! Configuration file tests

use micscribe_lib::config::{AppConfig, ConfigError, ConfigManager};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_save_and_load_config() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("micscribe.json");

    let mut config = AppConfig::default();
    config.audio.device = Some("USB Microphone".to_string());
    config.recognition.language_code = "de-DE".to_string();
    config.behavior.shutdown_grace_ms = 250;

    ConfigManager::save_to(&path, &config).unwrap();
    assert!(path.exists());

    let loaded = ConfigManager::load_from(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_load_partial_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{ "recognition": { "language_code": "fr-FR" } }"#).unwrap();

    let config = ConfigManager::load_from(&path).unwrap();

    assert_eq!(config.recognition.language_code, "fr-FR");
    assert_eq!(config.audio.sample_rate, 16000);
    assert_eq!(config.audio.chunk_ms, 100);
    assert!(config.recognition.interim_results);
}

#[test]
fn test_load_missing_file() {
    let dir = tempdir().unwrap();

    let result = ConfigManager::load_from(&dir.path().join("absent.json"));

    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn test_load_malformed_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, "{ not json").unwrap();

    assert!(matches!(
        ConfigManager::load_from(&path),
        Err(ConfigError::Json(_))
    ));
}

#[test]
fn test_load_rejects_invalid_values() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{ "audio": { "chunk_ms": 0 } }"#).unwrap();

    match ConfigManager::load_from(&path) {
        Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "audio.chunk_ms"),
        other => panic!("Expected Invalid error, got {:?}", other),
    }
}

#[test]
fn test_derived_settings() {
    let mut config = AppConfig::default();
    config.audio.sample_rate = 8000;
    config.audio.chunk_ms = 50;
    config.recognition.endpoint = "ws://127.0.0.1:9000/stream".to_string();
    config.recognition.connect_timeout_ms = 500;

    let format = config.capture_format();
    assert_eq!(format.frames_per_buffer, 400);
    assert_eq!(format.bytes_per_buffer(), 800);

    let connection = config.connection_config();
    assert_eq!(connection.endpoint, "ws://127.0.0.1:9000/stream");
    assert_eq!(connection.timeout_ms, 500);

    assert_eq!(config.streaming_config().config.sample_rate_hertz, 8000);
}
