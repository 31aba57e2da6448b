// Component hub configuration

use crate::logging::{LogConfig, LogFormat, LogLevel};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings of the component hub.
///
/// Every field has a default, so a partial document deserializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// URI prefix of every application
    pub context_path: String,
    /// Root directory of application and module assets
    pub asset_path: PathBuf,
    /// Root directory of application and module data
    pub data_path: PathBuf,
    /// Culture used when a request does not ask for one
    pub culture: String,
    /// Rebuild the sitemap as soon as a registration changes it
    pub auto_refresh: bool,
    /// Upper bound on parent chains; longer chains are treated as cycles
    pub max_parent_depth: usize,
    pub log: LogSettings,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            context_path: "/".to_string(),
            asset_path: PathBuf::from("./assets"),
            data_path: PathBuf::from("./data"),
            culture: "en".to_string(),
            auto_refresh: true,
            max_parent_depth: 32,
            log: LogSettings::default(),
        }
    }
}

impl HubConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context_path(mut self, path: impl Into<String>) -> Self {
        self.context_path = path.into();
        self
    }

    pub fn with_culture(mut self, culture: impl Into<String>) -> Self {
        self.culture = culture.into();
        self
    }

    pub fn with_auto_refresh(mut self, enabled: bool) -> Self {
        self.auto_refresh = enabled;
        self
    }

    pub fn with_max_parent_depth(mut self, depth: usize) -> Self {
        self.max_parent_depth = depth;
        self
    }
}

/// Serializable part of the logging setup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: LogLevel,
    pub format: LogFormat,
    /// `EnvFilter` directives, e.g. `webcore_core=debug`
    pub filter: Option<String>,
}

impl From<&LogSettings> for LogConfig {
    fn from(settings: &LogSettings) -> Self {
        let config = LogConfig::new().level(settings.level).format(settings.format);
        match &settings.filter {
            Some(filter) => config.with_env_filter(filter.clone()),
            None => config,
        }
    }
}

impl LogSettings {
    /// Install the global subscriber described by these settings.
    pub fn init(&self) -> Result<tracing_appender::non_blocking::WorkerGuard, crate::Error> {
        LogConfig::from(self).init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HubConfig::default();
        assert_eq!(config.context_path, "/");
        assert_eq!(config.culture, "en");
        assert!(config.auto_refresh);
        assert_eq!(config.max_parent_depth, 32);
    }

    #[test]
    fn test_partial_json() {
        let config: HubConfig =
            serde_json::from_str(r#"{"context_path": "/app", "log": {"level": "debug"}}"#).unwrap();
        assert_eq!(config.context_path, "/app");
        assert_eq!(config.culture, "en");
        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn test_log_settings_to_config() {
        let settings = LogSettings {
            level: LogLevel::Warn,
            format: LogFormat::Compact,
            filter: Some("webcore_core=trace".to_string()),
        };
        let config = LogConfig::from(&settings);
        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(config.env_filter.as_deref(), Some("webcore_core=trace"));
    }
}
