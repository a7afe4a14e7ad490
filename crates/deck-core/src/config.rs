//! Show configuration

use std::path::Path;
use serde::{Serialize, Deserialize};

use crate::dwell::DwellConfig;
use crate::error::ConfigError;

/// Settings that shape how a show runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowConfig {
    /// Dwell-time estimate for auto-advancing slides
    pub dwell: DwellConfig,

    /// Master switch for auto-advance; when off the auto marker is ignored
    pub auto_advance: bool,

    /// Move input focus into each newly shown slide
    pub focus_on_show: bool,
}

impl Default for ShowConfig {
    fn default() -> Self {
        Self {
            dwell: DwellConfig::default(),
            auto_advance: true,
            focus_on_show: true,
        }
    }
}

impl ShowConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Reject settings that would make auto-advance fire immediately
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dwell.base_ms == 0 && self.dwell.per_word_ms == 0 {
            return Err(ConfigError::Invalid(
                "dwell.base_ms and dwell.per_word_ms cannot both be zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = ShowConfig::from_json_str(r#"{ "focus_on_show": false }"#).unwrap();
        assert!(!config.focus_on_show);
        assert!(config.auto_advance);
        assert_eq!(config.dwell, DwellConfig::default());
    }

    #[test]
    fn test_nested_dwell_override() {
        let config = ShowConfig::from_json_str(r#"{ "dwell": { "per_word_ms": 200 } }"#).unwrap();
        assert_eq!(config.dwell.base_ms, 1300);
        assert_eq!(config.dwell.per_word_ms, 200);
    }

    #[test]
    fn test_zero_dwell_rejected() {
        let result = ShowConfig::from_json_str(r#"{ "dwell": { "base_ms": 0, "per_word_ms": 0 } }"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(ShowConfig::from_json_str("{"), Err(ConfigError::Json(_))));
    }
}
