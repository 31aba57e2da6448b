// Environment variable loading
//
// `WEBCORE_HUB__CULTURE=de` becomes the key `hub.culture`: the prefix is
// stripped, names are lowercased and a double underscore opens a section.

use crate::{ConfigError, Result};
use serde_json::Value;
use std::env;

/// Default prefix of hub variables
pub const DEFAULT_PREFIX: &str = "WEBCORE";

/// Environment variable loader
#[derive(Debug, Clone)]
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self {
            prefix: prefix.map(|p| p.trim_end_matches('_').to_uppercase()),
        }
    }

    /// Load the process environment as dotted keys.
    pub fn load(&self) -> Result<Vec<(String, Value)>> {
        Ok(self.load_from(env::vars()))
    }

    /// Load from explicit pairs instead of the process environment.
    pub fn load_from<I, K, V>(&self, vars: I) -> Vec<(String, Value)>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        vars.into_iter()
            .filter_map(|(key, value)| {
                let key = self.key_of(key.as_ref())?;
                Some((key, coerce(value.as_ref())))
            })
            .collect()
    }

    /// Load a specific environment variable
    pub fn load_var(&self, key: &str) -> Result<String> {
        env::var(self.var_name(key)).map_err(ConfigError::EnvError)
    }

    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Variable name of a dotted key, e.g. `hub.culture` -> `WEBCORE_HUB__CULTURE`.
    pub fn var_name(&self, key: &str) -> String {
        let name = key.replace('.', "__").to_uppercase();
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, name),
            None => name,
        }
    }

    fn key_of(&self, name: &str) -> Option<String> {
        let rest = match &self.prefix {
            Some(prefix) => name.strip_prefix(prefix.as_str())?.strip_prefix('_')?,
            None => name,
        };
        if rest.is_empty() {
            return None;
        }
        Some(rest.to_lowercase().replace("__", "."))
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(Some(DEFAULT_PREFIX.to_string()))
    }
}

/// Environment values are strings; booleans and numbers are typed so they
/// deserialize into the matching config fields.
fn coerce(raw: &str) -> Value {
    let raw = raw.trim();
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(number) = raw.parse::<i64>() {
        return Value::from(number);
    }
    if let Ok(number) = raw.parse::<f64>() {
        if number.is_finite() {
            return Value::from(number);
        }
    }
    Value::String(raw.to_string())
}
