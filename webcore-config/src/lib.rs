// Configuration management for the webcore component hub
//
// Settings are layered from TOML/JSON files, `.env` files and `WEBCORE_*`
// environment variables, then deserialized into a validated `HubConfig`.

pub mod env;
pub mod error;
pub mod loader;
pub mod manager;
pub mod validation;

pub use env::{DEFAULT_PREFIX, EnvLoader};
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use manager::{ConfigManager, ConfigManagerBuilder, HUB_SECTION};
pub use validation::{ConfigValidator, Validate};

use std::path::Path;
use webcore_core::HubConfig;

/// Load the hub settings from `path` with the environment layered on top.
pub fn load_hub_config(path: impl AsRef<Path>) -> Result<HubConfig> {
    let manager = ConfigManager::new();
    manager.load_file(path)?;
    manager.load_env()?;
    manager.hub_config()
}
