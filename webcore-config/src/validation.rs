// Configuration validation

use crate::{ConfigError, Result};
use webcore_core::{HubConfig, UriResource};

/// Upper bound accepted for `max_parent_depth`
pub const MAX_PARENT_DEPTH_LIMIT: usize = 1024;

/// Trait for validating configuration
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Configuration validator with rules
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!("{} cannot be empty", field)));
        }
        Ok(())
    }

    pub fn in_range<T: PartialOrd + std::fmt::Display>(value: T, min: T, max: T, field: &str) -> Result<()> {
        if value < min || value > max {
            return Err(ConfigError::ValidationError(format!(
                "{} must be between {} and {}, got {}",
                field, min, max, value
            )));
        }
        Ok(())
    }

    /// An absolute URI path such as `/` or `/portal`
    pub fn is_context_path(value: &str, field: &str) -> Result<()> {
        if !value.starts_with('/') {
            return Err(ConfigError::ValidationError(format!(
                "{} must start with '/', got {:?}",
                field, value
            )));
        }
        let uri = UriResource::parse(value)
            .map_err(|e| ConfigError::ValidationError(format!("{}: {}", field, e)))?;
        if uri.query().is_some() || uri.fragment().is_some() {
            return Err(ConfigError::ValidationError(format!(
                "{} must be a plain path",
                field
            )));
        }
        Ok(())
    }

    /// A culture tag like `en` or `de-CH`
    pub fn is_culture(value: &str, field: &str) -> Result<()> {
        let valid = !value.is_empty()
            && value
                .split('-')
                .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric()));
        if !valid {
            return Err(ConfigError::ValidationError(format!(
                "{} is not a culture tag: {:?}",
                field, value
            )));
        }
        Ok(())
    }
}

impl Validate for HubConfig {
    fn validate(&self) -> Result<()> {
        ConfigValidator::is_context_path(&self.context_path, "hub.context_path")?;
        ConfigValidator::not_empty(&self.asset_path.to_string_lossy(), "hub.asset_path")?;
        ConfigValidator::not_empty(&self.data_path.to_string_lossy(), "hub.data_path")?;
        ConfigValidator::is_culture(&self.culture, "hub.culture")?;
        ConfigValidator::in_range(self.max_parent_depth, 1, MAX_PARENT_DEPTH_LIMIT, "hub.max_parent_depth")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_empty_validation() {
        assert!(ConfigValidator::not_empty("value", "field").is_ok());
        assert!(ConfigValidator::not_empty("  ", "field").is_err());
    }

    #[test]
    fn test_range_validation() {
        assert!(ConfigValidator::in_range(5, 1, 10, "field").is_ok());
        assert!(ConfigValidator::in_range(0, 1, 10, "field").is_err());
        assert!(ConfigValidator::in_range(11, 1, 10, "field").is_err());
    }

    #[test]
    fn test_context_path_validation() {
        assert!(ConfigValidator::is_context_path("/", "field").is_ok());
        assert!(ConfigValidator::is_context_path("/portal/v2", "field").is_ok());
        assert!(ConfigValidator::is_context_path("portal", "field").is_err());
        assert!(ConfigValidator::is_context_path("/portal?x=1", "field").is_err());
    }

    #[test]
    fn test_culture_validation() {
        assert!(ConfigValidator::is_culture("en", "field").is_ok());
        assert!(ConfigValidator::is_culture("de-CH", "field").is_ok());
        assert!(ConfigValidator::is_culture("", "field").is_err());
        assert!(ConfigValidator::is_culture("en--us", "field").is_err());
    }

    #[test]
    fn test_hub_config_validation() {
        assert!(HubConfig::default().validate().is_ok());
        assert!(HubConfig::default().with_context_path("app").validate().is_err());
        assert!(HubConfig::default().with_max_parent_depth(0).validate().is_err());
        assert!(HubConfig::default().with_culture("").validate().is_err());
    }
}
