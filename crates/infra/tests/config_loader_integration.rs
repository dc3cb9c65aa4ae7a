//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files.

use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;
use tenantlink_domain::ErrorKind;
use tenantlink_infra::config;

fn config_file(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("tenantlink")
        .suffix(suffix)
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(contents.as_bytes()).expect("Failed to write to temp file");
    file
}

#[test]
fn test_load_config_from_json_file() {
    let file = config_file(
        ".json",
        r#"{
            "context_endpoint_url": "https://tenants.example.com/api",
            "authenticate": true,
            "authority": "https://id.example.com",
            "client_id": "tenant-reader",
            "client_secret": "s3cret",
            "scope": "tenants.read",
            "request_timeout_secs": 10
        }"#,
    );

    let config = config::load_from_file(Some(file.path().to_path_buf()))
        .expect("Failed to load config from JSON file");

    assert_eq!(config.endpoint_base(), "https://tenants.example.com/api");
    assert!(config.authenticate);
    assert_eq!(config.client_id, "tenant-reader");
    assert_eq!(config.request_timeout(), Duration::from_secs(10));
    assert!(config.ensure_can_authenticate().is_ok());
}

#[test]
fn test_load_config_from_toml_file() {
    let file = config_file(
        ".toml",
        r#"
        context_endpoint_url = "https://tenants.example.com"

        [discovery]
        require_https = false

        [policy.cache]
        ttl_secs = 60
        max_capacity = 50

        [policy.retry]
        max_attempts = 1

        [policy.circuit_breaker]
        enabled = false
        "#,
    );

    let config = config::load_from_file(Some(file.path().to_path_buf()))
        .expect("Failed to load config from TOML file");

    assert!(!config.authenticate);
    assert!(!config.discovery.require_https);
    assert!(config.discovery.validate_issuer_name);
    assert_eq!(config.policy.cache.ttl(), Duration::from_secs(60));
    assert_eq!(config.policy.cache.max_capacity, 50);
    assert_eq!(config.policy.retry.max_attempts, 1);
    assert!(!config.policy.circuit_breaker.enabled);
}

#[test]
fn test_load_config_missing_file() {
    let err = config::load_from_file(Some("/nonexistent/tenantlink.toml".into())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("Config file not found"));
}

#[test]
fn test_load_config_invalid_json() {
    let file = config_file(".json", "{ not json");
    let err = config::load_from_file(Some(file.path().to_path_buf())).unwrap_err();
    assert!(err.to_string().contains("Invalid JSON format"));
}

#[test]
fn test_load_config_unsupported_extension() {
    let file = config_file(".yaml", "context_endpoint_url: x");
    let err = config::load_from_file(Some(file.path().to_path_buf())).unwrap_err();
    assert!(err.to_string().contains("Unsupported config format: yaml"));
}
