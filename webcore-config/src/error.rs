// Configuration errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no configuration value at `{0}`")]
    KeyNotFound(String),

    /// A source could not be read
    #[error("cannot load configuration: {0}")]
    LoadError(String),

    /// A source was read but is not valid JSON, TOML or dotenv
    #[error("cannot parse configuration: {0}")]
    ParseError(String),

    #[error("invalid configuration: {0}")]
    ValidationError(String),

    #[error("cannot serialize configuration value: {0}")]
    SerializationError(String),

    #[error("configuration does not match the expected shape: {0}")]
    DeserializationError(String),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error("environment: {0}")]
    EnvError(#[from] std::env::VarError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration failures surface from the hub as [`webcore_core::Error::Config`].
impl From<ConfigError> for webcore_core::Error {
    fn from(error: ConfigError) -> Self {
        webcore_core::Error::Config(error.to_string())
    }
}
