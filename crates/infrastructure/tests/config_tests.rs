//! Configuration loading tests against real files

use std::{fs, path::PathBuf};

use infrastructure::AppConfig;
use secrecy::ExposeSecret;
use tempfile::TempDir;

fn write_config(contents: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, contents).unwrap();
    (dir, path)
}

#[test]
fn load_full_file() {
    let (_dir, path) = write_config(
        r#"
username = "jane"
password = "hunter2"

[portal]
base_url = "https://portal.example.com"
export_path = "/cal/export"
bootstrap_paths = ["/start"]
timeout_secs = 30

[browser]
headless = false
no_sandbox = true

[sync]
cron = "0 */15 * * * *"
run_on_start = false

[telemetry]
log_filter = "debug"
json = true
"#,
    );

    let config = AppConfig::load_from(&path).unwrap();
    assert!(config.validate().is_ok());

    assert_eq!(config.username.as_deref(), Some("jane"));
    assert_eq!(config.password.as_ref().unwrap().expose_secret(), "hunter2");
    assert_eq!(config.portal.base_url, "https://portal.example.com");
    assert_eq!(config.portal.export_path, "/cal/export");
    assert_eq!(config.portal.bootstrap_paths, vec!["/start".to_string()]);
    assert_eq!(config.portal.timeout_secs, 30);
    assert!(!config.browser.headless);
    assert!(config.browser.no_sandbox);
    assert_eq!(config.sync.cron, "0 */15 * * * *");
    assert!(!config.sync.run_on_start);
    assert_eq!(config.telemetry.log_filter, "debug");
    assert!(config.telemetry.json);

    let credentials = config.credentials().unwrap();
    assert_eq!(credentials.username(), "jane");
}

#[test]
fn missing_sections_use_defaults() {
    let (_dir, path) = write_config(
        r#"
[portal]
base_url = "https://portal.example.com"
"#,
    );

    let config = AppConfig::load_from(&path).unwrap();
    assert_eq!(config.portal.export_path, "/calendar/export");
    assert_eq!(config.portal.timeout_secs, 45);
    assert!(config.browser.headless);
    assert!(config.sync.enabled);
    assert_eq!(config.telemetry.log_filter, "info");
    assert!(config.credentials().is_none());
}

#[test]
fn missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let result = AppConfig::load_from(&dir.path().join("absent.toml"));
    assert!(result.is_err());
}

#[test]
fn invalid_values_fail_validation() {
    let (_dir, path) = write_config(
        r#"
[portal]
base_url = "ftp://portal.example.com"
"#,
    );

    let config = AppConfig::load_from(&path).unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.starts_with("portal:"));
}

#[test]
fn effective_toml_round_trips_without_password() {
    let (_dir, path) = write_config(
        r#"
username = "jane"
password = "hunter2"

[portal]
base_url = "https://portal.example.com"
"#,
    );

    let config = AppConfig::load_from(&path).unwrap();
    let rendered = config.to_toml().unwrap();
    assert!(!rendered.contains("hunter2"));

    let (_dir2, path2) = write_config(&rendered);
    let reloaded = AppConfig::load_from(&path2).unwrap();
    assert_eq!(reloaded.portal, config.portal);
    assert!(reloaded.password.is_none());
}
