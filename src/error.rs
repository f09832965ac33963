use crate::message::MessageError;
use crate::schema::{SchemaError, ValidationError};
use crate::sink::SinkError;

/// Raised while building a logger. Nothing is ever written when this occurs.
#[derive(thiserror::Error, Debug)]
pub enum ConfigurationError {
    #[error("service name is mandatory and must not be blank")]
    MissingServiceName,

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("environment variable {name} is invalid: {reason}")]
    InvalidEnv { name: &'static str, reason: String },
}

/// Everything a log call can fail with. A failed call never writes a
/// partial line.
#[derive(thiserror::Error, Debug)]
pub enum LogError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("invalid message: {0}")]
    InvalidMessage(#[from] MessageError),

    #[error("log entry failed validation: {0}")]
    Validation(#[from] ValidationError),

    #[error("failed to serialize log entry: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Sink(#[from] SinkError),
}
