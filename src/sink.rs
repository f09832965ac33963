use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Error returned by a [`LineSink`] that could not take a line.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("failed to write log line: {0}")]
    Io(#[from] io::Error),

    #[error("log sink lock was poisoned")]
    Poisoned,

    #[error("log sink is closed")]
    Closed,
}

/// Destination for serialized log lines.
///
/// Each call to [`LineSink::write_line`] receives exactly one complete JSON
/// line, newline included. Implementations must append it as a single unit
/// so lines from concurrent callers never interleave.
pub trait LineSink: Send + Sync {
    /// Append one line.
    ///
    /// **Parameters**
    /// - `line`: one serialized log entry terminated by `\n`.
    ///
    /// **Returns**
    /// - `Ok(())` once the line has been handed to the destination.
    /// - `Err(..)` if the destination rejected it; nothing is retried.
    fn write_line(&self, line: &str) -> Result<(), SinkError>;

    /// Flush buffered output, if any. Default implementation is a no-op.
    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: LineSink + ?Sized> LineSink for Arc<S> {
    fn write_line(&self, line: &str) -> Result<(), SinkError> {
        (**self).write_line(line)
    }

    fn flush(&self) -> Result<(), SinkError> {
        (**self).flush()
    }
}

/// Writes to the process's standard output, holding the stdout lock for
/// the whole line.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl LineSink for StdoutSink {
    fn write_line(&self, line: &str) -> Result<(), SinkError> {
        let mut out = io::stdout().lock();
        out.write_all(line.as_bytes())?;
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        io::stdout().lock().flush()?;
        Ok(())
    }
}

/// Wraps any [`Write`] (a file, a socket, a `Vec<u8>`) behind a mutex.
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer: Mutex::new(writer) }
    }

    pub fn into_inner(self) -> Result<W, SinkError> {
        self.writer.into_inner().map_err(|_| SinkError::Poisoned)
    }
}

impl<W: Write + Send> LineSink for WriterSink<W> {
    fn write_line(&self, line: &str) -> Result<(), SinkError> {
        let mut writer = self.writer.lock().map_err(|_| SinkError::Poisoned)?;
        writer.write_all(line.as_bytes())?;
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        let mut writer = self.writer.lock().map_err(|_| SinkError::Poisoned)?;
        writer.flush()?;
        Ok(())
    }
}

/// Keeps every line in memory. Clones share the same buffer, so a test can
/// hand one clone to a logger and read the output through another.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines written so far, without their trailing newline.
    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.iter().map(|line| line.trim_end_matches('\n').to_string()).collect(),
            Err(poisoned) => poisoned
                .into_inner()
                .iter()
                .map(|line| line.trim_end_matches('\n').to_string())
                .collect(),
        }
    }

    /// Everything written so far, concatenated exactly as received.
    pub fn contents(&self) -> String {
        match self.lines.lock() {
            Ok(lines) => lines.concat(),
            Err(poisoned) => poisoned.into_inner().concat(),
        }
    }

    /// Parse every line back into JSON. Lines that are not valid JSON are
    /// skipped.
    pub fn json_lines(&self) -> Vec<serde_json::Value> {
        self.lines()
            .iter()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        match self.lines.lock() {
            Ok(lines) => lines.is_empty(),
            Err(poisoned) => poisoned.into_inner().is_empty(),
        }
    }
}

impl LineSink for MemorySink {
    fn write_line(&self, line: &str) -> Result<(), SinkError> {
        self.lines
            .lock()
            .map_err(|_| SinkError::Poisoned)?
            .push(line.to_string());
        Ok(())
    }
}
