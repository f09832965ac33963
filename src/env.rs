//! Environment variable names read by [`crate::config::LoggerConfig::from_env`].
//!
//! These are purely helpers; the logger itself never reads the environment.

/// Service name written to `service.name`.
pub const JSON_LOG_SERVICE_NAME_ENV: &str = "JSON_LOG_SERVICE_NAME";

/// Minimum level: `debug`, `info`, `warn`, `error` or `critical`.
pub const JSON_LOG_LEVEL_ENV: &str = "JSON_LOG_LEVEL";

/// Optional value for the `ecs.version` envelope field.
pub const JSON_LOG_ECS_VERSION_ENV: &str = "JSON_LOG_ECS_VERSION";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an environment variable, treating unset and blank the same.
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}
