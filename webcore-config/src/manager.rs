// Layered configuration store

use crate::env::EnvLoader;
use crate::loader::{ConfigLoader, FileFormat, insert_path};
use crate::validation::Validate;
use crate::{ConfigError, Result};
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use webcore_core::HubConfig;

/// Section holding the hub settings
pub const HUB_SECTION: &str = "hub";

/// Configuration tree addressed by dotted keys (`hub.culture`).
///
/// Later layers override earlier ones key by key; tables are merged.
#[derive(Clone, Default)]
pub struct ConfigManager {
    config: Arc<RwLock<Map<String, Value>>>,
    env: EnvLoader,
}

impl ConfigManager {
    /// Manager reading `WEBCORE_*` variables
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            config: Arc::default(),
            env: EnvLoader::new(Some(prefix.into())),
        }
    }

    pub fn builder() -> ConfigManagerBuilder {
        ConfigManagerBuilder::new()
    }

    /// Layer the process environment on top.
    pub fn load_env(&self) -> Result<()> {
        let vars = self.env.load()?;
        debug!(count = vars.len(), "Loaded environment configuration");
        let mut config = self.config.write();
        for (key, value) in vars {
            insert_path(&mut config, &key, value);
        }
        Ok(())
    }

    /// Read a `.env` file into the process environment, then layer the
    /// environment. Without a path a missing `.env` is ignored.
    pub fn load_dotenv(&self, path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }
        self.load_env()
    }

    /// Layer a file; the format follows the extension.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let loader = ConfigLoader::auto(path)?;
        self.load_file_as(path, loader.format())
    }

    pub fn load_file_as(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let path = path.as_ref();
        let data = ConfigLoader::new(format).load_file(path)?;
        self.merge_value(data);
        info!(path = %path.display(), ?format, "Loaded configuration file");
        Ok(())
    }

    /// Layer a document given as a string.
    pub fn load_str(&self, content: &str, format: FileFormat) -> Result<()> {
        let data = ConfigLoader::new(format).parse(content)?;
        self.merge_value(data);
        Ok(())
    }

    pub fn set<T: Serialize>(&self, key: &str, value: T) -> Result<()> {
        let value = serde_json::to_value(value).map_err(|e| ConfigError::SerializationError(e.to_string()))?;
        insert_path(&mut self.config.write(), key, value);
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .value(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;
        serde_json::from_value(value).map_err(|e| ConfigError::DeserializationError(format!("{}: {}", key, e)))
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn get_string(&self, key: &str) -> Result<String> {
        self.get(key)
    }

    pub fn get_int(&self, key: &str) -> Result<i64> {
        self.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.value(key).is_some()
    }

    /// Top-level keys
    pub fn keys(&self) -> Vec<String> {
        self.config.read().keys().cloned().collect()
    }

    /// Layer another manager's tree on top of this one.
    pub fn merge(&self, other: &ConfigManager) {
        let other = Value::Object(other.config.read().clone());
        self.merge_value(other);
    }

    /// Deserialize a section (or the whole tree for `""`) and validate it.
    pub fn extract<T: DeserializeOwned + Validate>(&self, section: &str) -> Result<T> {
        let value = if section.is_empty() {
            Value::Object(self.config.read().clone())
        } else {
            self.value(section)
                .ok_or_else(|| ConfigError::KeyNotFound(section.to_string()))?
        };
        let extracted: T =
            serde_json::from_value(value).map_err(|e| ConfigError::DeserializationError(e.to_string()))?;
        extracted.validate()?;
        Ok(extracted)
    }

    /// The hub settings: the `hub` section if present, else the top level.
    /// Missing fields take their defaults.
    pub fn hub_config(&self) -> Result<HubConfig> {
        let section = if self.has(HUB_SECTION) { HUB_SECTION } else { "" };
        self.extract(section)
    }

    fn value(&self, key: &str) -> Option<Value> {
        let config = self.config.read();
        let mut parts = key.split('.').filter(|part| !part.is_empty());
        let mut current = config.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current.clone())
    }

    fn merge_value(&self, data: Value) {
        if let Value::Object(map) = data {
            merge_into(&mut self.config.write(), map);
        }
    }
}

fn merge_into(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, value) in source {
        let Value::Object(incoming) = value else {
            target.insert(key, value);
            continue;
        };
        if let Some(Value::Object(existing)) = target.get_mut(&key) {
            merge_into(existing, incoming);
            continue;
        }
        target.insert(key, Value::Object(incoming));
    }
}

/// Builds a [`ConfigManager`] from layers applied in a fixed order:
/// files, then `.env`, then the environment.
#[derive(Default)]
pub struct ConfigManagerBuilder {
    prefix: Option<String>,
    files: Vec<(String, Option<FileFormat>)>,
    load_dotenv: bool,
    dotenv_path: Option<String>,
    load_env: bool,
}

impl ConfigManagerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn add_file(mut self, path: impl Into<String>) -> Self {
        self.files.push((path.into(), None));
        self
    }

    pub fn add_file_as(mut self, path: impl Into<String>, format: FileFormat) -> Self {
        self.files.push((path.into(), Some(format)));
        self
    }

    pub fn load_dotenv(mut self, path: Option<String>) -> Self {
        self.load_dotenv = true;
        self.dotenv_path = path;
        self
    }

    pub fn load_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    pub fn build(self) -> Result<ConfigManager> {
        let manager = match self.prefix {
            Some(prefix) => ConfigManager::with_prefix(prefix),
            None => ConfigManager::new(),
        };

        for (path, format) in &self.files {
            match format {
                Some(format) => manager.load_file_as(path, *format)?,
                None => manager.load_file(path)?,
            }
        }
        if self.load_dotenv {
            manager.load_dotenv(self.dotenv_path.as_deref().map(Path::new))?;
        } else if self.load_env {
            manager.load_env()?;
        }
        Ok(manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get_dotted() {
        let manager = ConfigManager::new();
        manager.set("hub.culture", "fr").unwrap();

        assert_eq!(manager.get_string("hub.culture").unwrap(), "fr");
        assert!(manager.has("hub"));
        assert!(!manager.has("hub.missing"));
        assert_eq!(manager.keys(), vec!["hub".to_string()]);
    }

    #[test]
    fn test_get_or_default() {
        let manager = ConfigManager::new();
        let value: String = manager.get_or("missing_key", "default_value".to_string());
        assert_eq!(value, "default_value");
        assert!(matches!(manager.get_int("missing_key"), Err(ConfigError::KeyNotFound(_))));
    }

    #[test]
    fn test_layers_merge_tables() {
        let manager = ConfigManager::new();
        manager
            .load_str(r#"{"hub": {"culture": "fr", "context_path": "/app"}}"#, FileFormat::Json)
            .unwrap();
        manager.load_str("[hub]\nculture = \"de\"\n", FileFormat::Toml).unwrap();

        assert_eq!(manager.get_string("hub.culture").unwrap(), "de");
        assert_eq!(manager.get_string("hub.context_path").unwrap(), "/app");
    }

    #[test]
    fn test_merge_managers() {
        let base = ConfigManager::new();
        base.set("hub.auto_refresh", true).unwrap();
        let overlay = ConfigManager::new();
        overlay.set("hub.auto_refresh", false).unwrap();

        base.merge(&overlay);
        assert!(!base.get_bool("hub.auto_refresh").unwrap());
    }

    #[test]
    fn test_hub_config_from_section() {
        let manager = ConfigManager::new();
        manager
            .load_str("[hub]\nculture = \"de\"\nmax_parent_depth = 8\n", FileFormat::Toml)
            .unwrap();

        let config = manager.hub_config().unwrap();
        assert_eq!(config.culture, "de");
        assert_eq!(config.max_parent_depth, 8);
        assert_eq!(config.context_path, "/");
    }

    #[test]
    fn test_hub_config_from_top_level() {
        let manager = ConfigManager::new();
        manager.set("context_path", "/portal").unwrap();

        let config = manager.hub_config().unwrap();
        assert_eq!(config.context_path, "/portal");
    }

    #[test]
    fn test_hub_config_rejects_invalid_values() {
        let manager = ConfigManager::new();
        manager.set("hub.context_path", "portal").unwrap();
        assert!(matches!(manager.hub_config(), Err(ConfigError::ValidationError(_))));

        let manager = ConfigManager::new();
        manager.set("hub.max_parent_depth", "deep").unwrap();
        assert!(matches!(manager.hub_config(), Err(ConfigError::DeserializationError(_))));
    }
}
