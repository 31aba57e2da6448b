//! Integration tests for webcore-config

use std::io::Write;
use webcore_config::*;
use webcore_core::logging::{LogFormat, LogLevel};
use webcore_core::{ComponentHub, HubConfig};

fn temp_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_hub_config_from_toml_file() {
    let file = temp_file(
        ".toml",
        r#"
        [hub]
        context_path = "/portal"
        culture = "de-CH"
        auto_refresh = false

        [hub.log]
        level = "debug"
        format = "pretty"
        "#,
    );

    let manager = ConfigManager::builder().add_file(file.path().to_string_lossy()).build().unwrap();
    let config = manager.hub_config().unwrap();

    assert_eq!(config.context_path, "/portal");
    assert_eq!(config.culture, "de-CH");
    assert!(!config.auto_refresh);
    assert_eq!(config.log.level, LogLevel::Debug);
    assert_eq!(config.log.format, LogFormat::Pretty);
    assert_eq!(config.max_parent_depth, HubConfig::default().max_parent_depth);
}

#[test]
fn test_later_files_override_earlier_ones() {
    let base = temp_file(".json", r#"{"hub": {"culture": "fr", "max_parent_depth": 16}}"#);
    let overlay = temp_file(".toml", "[hub]\nculture = \"it\"\n");

    let manager = ConfigManager::builder()
        .add_file(base.path().to_string_lossy())
        .add_file(overlay.path().to_string_lossy())
        .build()
        .unwrap();
    let config = manager.hub_config().unwrap();

    assert_eq!(config.culture, "it");
    assert_eq!(config.max_parent_depth, 16);
}

#[test]
fn test_env_file_with_explicit_format() {
    let file = temp_file(".conf", "HUB__CULTURE=nl\nHUB__MAX_PARENT_DEPTH=4\n");

    let manager = ConfigManager::builder()
        .add_file_as(file.path().to_string_lossy(), FileFormat::Env)
        .build()
        .unwrap();
    let config = manager.hub_config().unwrap();

    assert_eq!(config.culture, "nl");
    assert_eq!(config.max_parent_depth, 4);
}

#[test]
fn test_missing_file_is_an_error() {
    let result = ConfigManager::builder().add_file("/nonexistent/webcore/hub.toml").build();
    assert!(matches!(result, Err(ConfigError::LoadError(_))));
}

#[test]
fn test_invalid_file_is_rejected() {
    let file = temp_file(".toml", "[hub]\ncontext_path = \"relative\"\n");
    let manager = ConfigManager::builder().add_file(file.path().to_string_lossy()).build().unwrap();

    let error = manager.hub_config().unwrap_err();
    assert!(matches!(error, ConfigError::ValidationError(_)));

    let core: webcore_core::Error = error.into();
    assert!(matches!(core, webcore_core::Error::Config(_)));
}

#[test]
fn test_loaded_config_drives_the_hub() {
    let file = temp_file(".toml", "[hub]\ncontext_path = \"/portal\"\nculture = \"fr\"\n");
    let manager = ConfigManager::builder().add_file(file.path().to_string_lossy()).build().unwrap();

    let hub = ComponentHub::new(manager.hub_config().unwrap());
    assert_eq!(hub.config().context_path, "/portal");

    let request = webcore_core::Request::get("/portal/x").unwrap();
    assert_eq!(hub.search_context(&request).culture, "fr");
}
