use serde::Deserialize;
use serde_json::Value;

use crate::env::{env_opt, env_or, JSON_LOG_ECS_VERSION_ENV, JSON_LOG_LEVEL_ENV, JSON_LOG_SERVICE_NAME_ENV};
use crate::error::ConfigurationError;
use crate::level::Level;
use crate::logger::LoggerBuilder;
use crate::schema::ValidationSchema;
use crate::tree::PropertyTree;

/// Data-only logger options, loadable from any serde format.
///
/// The clock and the output sink are code, not data; add them to the
/// builder returned by [`LoggerConfig::into_builder`].
///
/// ```
/// use json_line_logger::config::LoggerConfig;
///
/// let config: LoggerConfig = serde_json::from_str(
///     r#"{"service_name": "petshop", "level": "warn", "default_properties": {"shop.id": 7}}"#,
/// ).unwrap();
/// let logger = config.into_builder().unwrap().build().unwrap();
/// assert_eq!(logger.service_name(), "petshop");
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub service_name: String,
    pub level: Level,
    pub default_properties: PropertyTree,
    /// Inline schema document; the built-in one is used when absent.
    pub validation_schema: Option<Value>,
    pub ecs_version: Option<String>,
}

impl LoggerConfig {
    /// Build a config from `JSON_LOG_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let level = env_or(JSON_LOG_LEVEL_ENV, "debug")
            .parse::<Level>()
            .map_err(|e| ConfigurationError::InvalidEnv {
                name: JSON_LOG_LEVEL_ENV,
                reason: e.to_string(),
            })?;

        Ok(Self {
            service_name: env_or(JSON_LOG_SERVICE_NAME_ENV, ""),
            level,
            ecs_version: env_opt(JSON_LOG_ECS_VERSION_ENV),
            ..Self::default()
        })
    }

    pub fn into_builder(self) -> Result<LoggerBuilder, ConfigurationError> {
        let mut builder = LoggerBuilder::new(self.service_name)
            .level(self.level)
            .default_properties(self.default_properties);
        if let Some(document) = self.validation_schema {
            builder = builder.validation_schema(ValidationSchema::new(document)?);
        }
        if let Some(version) = self.ecs_version {
            builder = builder.ecs_version(version);
        }
        Ok(builder)
    }
}
