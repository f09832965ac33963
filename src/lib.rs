pub mod tree;
pub mod dotted;
pub mod message;
pub mod fault;
pub mod schema;
pub mod level;
pub mod clock;
pub mod record;
pub mod error;
pub mod sink;
pub mod noop_sink;
pub mod logger;
pub mod config;
pub mod env;
pub mod layer;
pub mod init;

#[cfg(feature = "async-sink")]
pub mod channel_sink;

pub use error::{ConfigurationError, LogError};
pub use fault::Fault;
pub use level::Level;
pub use logger::{Logger, LoggerBuilder};
pub use message::{LogInput, Message, MessageError};
pub use schema::{SchemaValidator, ValidationError, ValidationSchema};
pub use tree::PropertyTree;
