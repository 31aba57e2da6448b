// Configuration file loaders

use crate::env::EnvLoader;
use crate::{ConfigError, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
    Env,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            "env" => Some(FileFormat::Env),
            _ => None,
        }
    }

    /// Format of a path, by extension; `.env` files have no extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        if path.file_name().and_then(|n| n.to_str()) == Some(".env") {
            return Some(FileFormat::Env);
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// Parses one configuration document into a JSON tree.
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Loader for the format of `path`
    pub fn auto(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        FileFormat::from_path(path)
            .map(Self::new)
            .ok_or_else(|| ConfigError::LoadError(format!("Unsupported format: {}", path.display())))
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Value> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadError(format!("{}: {}", path.display(), e)))?;
        self.parse(&content)
    }

    /// Parse a document. The result is always an object.
    pub fn parse(&self, content: &str) -> Result<Value> {
        let value = match self.format {
            FileFormat::Json => serde_json::from_str(content)
                .map_err(|e| ConfigError::ParseError(format!("JSON parse error: {}", e)))?,
            FileFormat::Toml => {
                let document: toml::Table = toml::from_str(content)
                    .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;
                serde_json::to_value(document)
                    .map_err(|e| ConfigError::SerializationError(e.to_string()))?
            }
            FileFormat::Env => parse_env(content)?,
        };

        match value {
            Value::Object(_) => Ok(value),
            other => Err(ConfigError::ParseError(format!(
                "expected a table at the top level, found {}",
                kind_of(&other)
            ))),
        }
    }
}

fn parse_env(content: &str) -> Result<Value> {
    let mut pairs = Vec::new();
    for entry in dotenvy::from_read_iter(content.as_bytes()) {
        pairs.push(entry.map_err(|e| ConfigError::ParseError(format!("dotenv parse error: {}", e)))?);
    }

    let mut root = Map::new();
    for (key, value) in EnvLoader::new(None).load_from(pairs) {
        insert_path(&mut root, &key, value);
    }
    Ok(Value::Object(root))
}

/// Insert `value` at a dotted key, creating intermediate tables.
pub(crate) fn insert_path(root: &mut Map<String, Value>, key: &str, value: Value) {
    let mut parts = key.split('.').filter(|part| !part.is_empty()).peekable();
    let mut table = root;
    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            table.insert(part.to_string(), value);
            return;
        }
        let slot = table
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Value::Object(next) = slot else {
            return;
        };
        table = next;
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a table",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json() {
        let loader = ConfigLoader::new(FileFormat::Json);
        let result = loader.parse(r#"{"hub": {"culture": "fr"}}"#).unwrap();
        assert_eq!(result["hub"]["culture"], "fr");

        assert!(loader.parse("[1, 2]").is_err());
    }

    #[test]
    fn test_parse_toml() {
        let loader = ConfigLoader::new(FileFormat::Toml);
        let toml = r#"
            [hub]
            context_path = "/portal"
            max_parent_depth = 8

            [hub.log]
            level = "debug"
        "#;

        let result = loader.parse(toml).unwrap();
        assert_eq!(result["hub"]["context_path"], "/portal");
        assert_eq!(result["hub"]["max_parent_depth"], 8);
        assert_eq!(result["hub"]["log"]["level"], "debug");
    }

    #[test]
    fn test_parse_env() {
        let loader = ConfigLoader::new(FileFormat::Env);
        let env = "# hub settings\nHUB__CULTURE=\"de\"\nHUB__AUTO_REFRESH=false\n";

        let result = loader.parse(env).unwrap();
        assert_eq!(result["hub"]["culture"], "de");
        assert_eq!(result["hub"]["auto_refresh"], false);
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(FileFormat::from_extension("JSON"), Some(FileFormat::Json));
        assert_eq!(FileFormat::from_extension("unknown"), None);
        assert_eq!(FileFormat::from_path(Path::new("conf/hub.toml")), Some(FileFormat::Toml));
        assert_eq!(FileFormat::from_path(Path::new("conf/.env")), Some(FileFormat::Env));
        assert!(ConfigLoader::auto("hub.yaml").is_err());
    }

    #[test]
    fn test_insert_path_overwrites_scalars() {
        let mut root = Map::new();
        insert_path(&mut root, "hub", Value::from("flat"));
        insert_path(&mut root, "hub.culture", Value::from("it"));
        assert_eq!(Value::Object(root)["hub"]["culture"], "it");
    }
}
