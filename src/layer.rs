use crate::level::Level;
use crate::logger::Logger;
use crate::message::LogInput;
use crate::tree::PropertyTree;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Targets that are never forwarded, so the logger's own diagnostics do not
/// loop back into it.
const SELF_TARGET: &str = "json_line_logger";

/// `tracing_subscriber` layer that routes `tracing` events through a
/// [`Logger`].
///
/// Event fields become properties of the logged tree (dotted field names
/// such as `http.method` expand like any other dotted key), the event's
/// message becomes `message`, and the event level maps onto [`Level`]
/// (`TRACE` is logged as debug). Events the logger rejects are counted and
/// reported on stderr; they never panic the application.
pub struct JsonLineLayer {
    logger: Logger,
    /// Events forwarded to the logger.
    pub forwarded_events: Arc<AtomicU64>,
    /// Events the logger refused (missing message, validation failure, ...).
    pub failed_events: Arc<AtomicU64>,
}

impl JsonLineLayer {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            forwarded_events: Arc::new(AtomicU64::new(0)),
            failed_events: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }
}

impl<S> Layer<S> for JsonLineLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if meta.target().starts_with(SELF_TARGET) {
            return;
        }
        let level = Level::from(meta.level());
        if !self.logger.enabled(level) {
            return;
        }

        let mut fields = PropertyTree::new();
        let mut visitor = FieldVisitor { fields: &mut fields };
        event.record(&mut visitor);

        self.forwarded_events.fetch_add(1, Ordering::Relaxed);
        if let Err(e) = self.logger.log(level, LogInput::Tree(fields)) {
            self.failed_events.fetch_add(1, Ordering::Relaxed);
            eprintln!("failed to log tracing event from {}: {}", meta.target(), e);
        }
    }
}

/// Collects an event's fields into a [`PropertyTree`], keeping numbers and
/// booleans as JSON scalars.
pub struct FieldVisitor<'a> {
    pub fields: &'a mut PropertyTree,
}

impl FieldVisitor<'_> {
    fn insert(&mut self, field: &Field, value: Value) {
        self.fields.insert(field.name().to_string(), value);
    }
}

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::String(value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, Value::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        // `message` arrives as `format_args!`, whose Debug output is the text itself.
        self.insert(field, Value::String(format!("{:?}", value)));
    }
}
