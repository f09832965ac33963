use crate::sink::{LineSink, SinkError};

/// A sink that simply drops all lines.
///
/// Useful for measuring the overhead of the merge and validation pipeline
/// without any I/O, and for tests that only care about returned errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl LineSink for NoopSink {
    fn write_line(&self, _line: &str) -> Result<(), SinkError> {
        Ok(())
    }
}
