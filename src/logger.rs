use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::clock::{format_timestamp, system_clock, Clock};
use crate::dotted::expand;
use crate::error::{ConfigurationError, LogError};
use crate::fault::Fault;
use crate::level::Level;
use crate::message::{LogInput, Message};
use crate::record::LogRecord;
use crate::schema::{SchemaValidator, ValidationError, ValidationSchema, Verdict};
use crate::sink::{LineSink, StdoutSink};
use crate::tree::{merge_into, PropertyTree};

/// Zero-argument function re-evaluated on every log call to contribute
/// dynamic properties (request ids, trace ids, ...).
pub type ContextProvider = Arc<dyn Fn() -> PropertyTree + Send + Sync>;

/// Structured logger writing one JSON object per line.
///
/// A `Logger` never changes after it is built. [`Logger::with`],
/// [`Logger::context_provider`], [`Logger::validation_schema`] and friends
/// return a new instance that shares the sink, clock and service name.
///
/// Every call goes through the same steps: envelope fields, scoped
/// properties, context providers in registration order, the call's own
/// message, dotted-key expansion over the merged tree, schema validation,
/// then a single write to the sink.
#[derive(Clone)]
pub struct Logger {
    service_name: Arc<str>,
    ecs_version: Option<Arc<str>>,
    clock: Clock,
    output: Arc<dyn LineSink>,
    level: Level,
    scoped_properties: Arc<PropertyTree>,
    context_providers: Arc<[ContextProvider]>,
    validator: SchemaValidator,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("service_name", &self.service_name)
            .field("level", &self.level)
            .field("scoped_properties", &self.scoped_properties)
            .field("context_providers", &self.context_providers.len())
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}

impl Logger {
    /// Logger for `service_name` writing to stdout with every other option
    /// at its default.
    pub fn new(service_name: impl Into<String>) -> Result<Self, ConfigurationError> {
        Self::builder(service_name).build()
    }

    pub fn builder(service_name: impl Into<String>) -> LoggerBuilder {
        LoggerBuilder::new(service_name)
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn scoped_properties(&self) -> &PropertyTree {
        &self.scoped_properties
    }

    /// Whether a call at `level` would be written.
    pub fn enabled(&self, level: Level) -> bool {
        level.passes(self.level)
    }

    /// New logger whose scoped properties are exactly `properties`.
    ///
    /// Previously scoped properties are dropped, not merged: chaining
    /// `.with(a).with(b)` logs `b` only. Context providers are kept.
    pub fn with(&self, properties: PropertyTree) -> Self {
        Self {
            scoped_properties: Arc::new(properties),
            ..self.clone()
        }
    }

    /// New logger with `provider` appended to the existing providers.
    pub fn context_provider<F>(&self, provider: F) -> Self
    where
        F: Fn() -> PropertyTree + Send + Sync + 'static,
    {
        let mut providers: Vec<ContextProvider> = self.context_providers.to_vec();
        providers.push(Arc::new(provider));
        Self {
            context_providers: providers.into(),
            ..self.clone()
        }
    }

    /// New logger validating against `schema`. The error handler is kept.
    pub fn validation_schema(&self, schema: ValidationSchema) -> Self {
        Self {
            validator: self.validator.with_schema(schema),
            ..self.clone()
        }
    }

    /// New logger whose validation failures go through `handler`.
    ///
    /// Returning `Ok(())` swallows the failure: the call succeeds and
    /// nothing is written. Returning `Err` fails the call with that error.
    pub fn on_validation_error<F>(&self, handler: F) -> Self
    where
        F: Fn(ValidationError) -> Result<(), ValidationError> + Send + Sync + 'static,
    {
        Self {
            validator: self.validator.with_handler(handler),
            ..self.clone()
        }
    }

    /// New logger with a different severity threshold.
    pub fn with_level(&self, level: Level) -> Self {
        Self { level, ..self.clone() }
    }

    pub fn debug(&self, input: impl Into<LogInput>) -> Result<(), LogError> {
        self.log(Level::Debug, input)
    }

    pub fn info(&self, input: impl Into<LogInput>) -> Result<(), LogError> {
        self.log(Level::Info, input)
    }

    pub fn warn(&self, input: impl Into<LogInput>) -> Result<(), LogError> {
        self.log(Level::Warn, input)
    }

    pub fn error(&self, input: impl Into<LogInput>) -> Result<(), LogError> {
        self.log(Level::Error, input)
    }

    pub fn critical(&self, input: impl Into<LogInput>) -> Result<(), LogError> {
        self.log(Level::Critical, input)
    }

    /// Log `input` at error level with `fault` attached under `error`.
    pub fn error_with(&self, input: impl Into<LogInput>, fault: &Fault) -> Result<(), LogError> {
        self.log_with_fault(Level::Error, Some(input.into()), fault)
    }

    pub fn log(&self, level: Level, input: impl Into<LogInput>) -> Result<(), LogError> {
        if !self.enabled(level) {
            tracing::trace!(%level, threshold = %self.level, "log call below threshold");
            return Ok(());
        }
        let message = Message::construct(input)?;
        self.emit(level, message)
    }

    /// Log at any level with an error attached. When `input` is `None` or
    /// has a blank message, the error's description becomes the message.
    pub fn log_with_fault(&self, level: Level, input: Option<LogInput>, fault: &Fault) -> Result<(), LogError> {
        if !self.enabled(level) {
            tracing::trace!(%level, threshold = %self.level, "log call below threshold");
            return Ok(());
        }
        let message = Message::with_fault(input, fault)?;
        self.emit(level, message)
    }

    /// Build the canonical tree for `message` without validating or
    /// writing it.
    pub fn compose(&self, level: Level, message: Message) -> PropertyTree {
        let mut entry = self.envelope(level);

        merge_into(&mut entry, expand(self.scoped_properties.as_ref().clone()));
        for provider in self.context_providers.iter() {
            merge_into(&mut entry, expand(provider()));
        }
        merge_into(&mut entry, expand(message.into_tree()));

        // Layers are expanded one by one so a later layer's nested form
        // overrides an earlier layer's dotted form; this final pass catches
        // dotted keys produced by the merge itself.
        expand(entry)
    }

    fn emit(&self, level: Level, message: Message) -> Result<(), LogError> {
        let entry = self.compose(level, message);

        if self.validator.validate(&entry)? == Verdict::Swallowed {
            tracing::warn!(%level, "log entry failed validation, dropped by error handler");
            return Ok(());
        }

        let line = LogRecord::new(entry).to_json_line()?;
        self.output.write_line(&line)?;
        Ok(())
    }

    fn envelope(&self, level: Level) -> PropertyTree {
        let mut envelope = PropertyTree::new();
        if let Some(version) = &self.ecs_version {
            envelope.insert("ecs".to_string(), single("version", Value::String(version.to_string())));
        }
        envelope.insert("@timestamp".to_string(), Value::String(format_timestamp(&(self.clock)())));
        envelope.insert("service".to_string(), single("name", Value::String(self.service_name.to_string())));
        envelope.insert("log".to_string(), single("level", Value::String(level.as_str().to_string())));
        envelope
    }
}

fn single(key: &str, value: Value) -> Value {
    let mut tree = PropertyTree::new();
    tree.insert(key.to_string(), value);
    Value::Object(tree)
}

/// Collects the construction options of a [`Logger`].
pub struct LoggerBuilder {
    service_name: String,
    clock: Option<Clock>,
    output: Option<Arc<dyn LineSink>>,
    level: Level,
    default_properties: PropertyTree,
    validation_schema: Option<ValidationSchema>,
    ecs_version: Option<String>,
    context_providers: Vec<ContextProvider>,
}

impl LoggerBuilder {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            clock: None,
            output: None,
            level: Level::default(),
            default_properties: PropertyTree::new(),
            validation_schema: None,
            ecs_version: None,
            context_providers: Vec::new(),
        }
    }

    /// Clock used for `@timestamp`. Defaults to the system UTC clock.
    pub fn now<F>(mut self, now: F) -> Self
    where
        F: Fn() -> chrono::DateTime<chrono::Utc> + Send + Sync + 'static,
    {
        self.clock = Some(Arc::new(now));
        self
    }

    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Where lines go. Defaults to standard output.
    pub fn output<S>(mut self, sink: S) -> Self
    where
        S: LineSink + 'static,
    {
        self.output = Some(Arc::new(sink));
        self
    }

    pub fn shared_output(mut self, sink: Arc<dyn LineSink>) -> Self {
        self.output = Some(sink);
        self
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Scoped properties of the built logger.
    pub fn default_properties(mut self, properties: PropertyTree) -> Self {
        self.default_properties = properties;
        self
    }

    pub fn validation_schema(mut self, schema: ValidationSchema) -> Self {
        self.validation_schema = Some(schema);
        self
    }

    /// Emit `ecs.version` with every line.
    pub fn ecs_version(mut self, version: impl Into<String>) -> Self {
        self.ecs_version = Some(version.into());
        self
    }

    pub fn context_provider<F>(mut self, provider: F) -> Self
    where
        F: Fn() -> PropertyTree + Send + Sync + 'static,
    {
        self.context_providers.push(Arc::new(provider));
        self
    }

    pub fn build(self) -> Result<Logger, ConfigurationError> {
        let service_name = self.service_name.trim();
        if service_name.is_empty() {
            return Err(ConfigurationError::MissingServiceName);
        }

        let schema = match self.validation_schema {
            Some(schema) => schema,
            None => ValidationSchema::message_schema()?,
        };

        Ok(Logger {
            service_name: Arc::from(self.service_name.as_str()),
            ecs_version: self.ecs_version.map(|version| Arc::from(version.as_str())),
            clock: self.clock.unwrap_or_else(system_clock),
            output: self.output.unwrap_or_else(|| Arc::new(StdoutSink)),
            level: self.level,
            scoped_properties: Arc::new(self.default_properties),
            context_providers: self.context_providers.into(),
            validator: SchemaValidator::new(schema),
        })
    }
}
