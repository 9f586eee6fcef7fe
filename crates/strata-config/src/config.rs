//! Main configuration type.

use serde::{Deserialize, Serialize};
use strata_telemetry::LogConfig;

use crate::{BatchSection, ConfigError, CorsSection, ErrorHandlerSection, XsrfSection};

/// Complete Strata configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use strata_config::StrataConfig;
///
/// let config = StrataConfig::default();
/// assert_eq!(config.xsrf.header_name, "x-xsrf-token");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct StrataConfig {
    /// CORS middleware settings.
    #[serde(default)]
    pub cors: CorsSection,

    /// Error handler settings.
    #[serde(default)]
    pub error_handler: ErrorHandlerSection,

    /// Batch iteration settings.
    #[serde(default)]
    pub batch: BatchSection,

    /// XSRF verification settings.
    #[serde(default)]
    pub xsrf: XsrfSection,

    /// Logging settings.
    #[serde(default)]
    pub logging: LogConfig,
}

impl StrataConfig {
    /// Development preset: pretty debug logging.
    #[must_use]
    pub fn development() -> Self {
        Self {
            logging: LogConfig::development(),
            ..Self::default()
        }
    }

    /// Production preset: JSON logging at `info`.
    #[must_use]
    pub fn production() -> Self {
        Self {
            logging: LogConfig::production(),
            ..Self::default()
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if:
    /// - the CORS method list is empty
    /// - a blacklist status code is outside `100..=599`
    /// - the XSRF header name is empty
    /// - the log level is not a valid filter directive
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cors.methods.is_empty() {
            return Err(ConfigError::invalid_value(
                "cors.methods",
                "at least one method is required",
            ));
        }

        for (index, entry) in self.error_handler.blacklist.iter().enumerate() {
            for (field, code) in [
                ("status_code", entry.status_code),
                ("alternative_status_code", entry.alternative_status_code),
            ] {
                if let Some(code) = code.filter(|code| !(100..=599).contains(code)) {
                    return Err(ConfigError::invalid_value(
                        format!("error_handler.blacklist[{index}].{field}"),
                        format!("{code} is not an HTTP status code"),
                    ));
                }
            }
        }

        if self.xsrf.header_name.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "xsrf.header_name",
                "must not be empty",
            ));
        }

        if self.logging.enabled {
            strata_telemetry::create_env_filter(&self.logging.level)
                .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BlacklistEntry;

    #[test]
    fn test_default_config_is_valid() {
        StrataConfig::default().validate().unwrap();
        StrataConfig::development().validate().unwrap();
    }

    #[test]
    fn test_presets() {
        assert!(!StrataConfig::development().logging.json_format);
        assert!(StrataConfig::production().logging.json_format);
    }

    #[test]
    fn test_validate_empty_methods() {
        let mut config = StrataConfig::default();
        config.cors.methods.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cors.methods"));
    }

    #[test]
    fn test_validate_blacklist_status() {
        let mut config = StrataConfig::default();
        config.error_handler.blacklist.push(BlacklistEntry {
            status_code: Some(404),
            alternative_message: "Gone".to_string(),
            alternative_status_code: Some(4100),
        });
        let err = config.validate().unwrap_err();
        assert!(err
            .to_string()
            .contains("error_handler.blacklist[4].alternative_status_code"));
    }

    #[test]
    fn test_validate_xsrf_header() {
        let mut config = StrataConfig::default();
        config.xsrf.header_name = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = StrataConfig::default();
        config.logging.level = "strata=loud".to_string();
        assert!(config.validate().is_err());

        config.logging.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = StrataConfig::development();
        let text = toml::to_string(&config).unwrap();
        let parsed: StrataConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = toml::from_str::<StrataConfig>(
            r#"
            [cors]
            origins = "*"
            "#,
        );
        assert!(result.is_err());

        let result = toml::from_str::<StrataConfig>("[server]\nport = 1");
        assert!(result.is_err());
    }
}
