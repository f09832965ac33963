use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::fmt;
use std::panic::Location;

use serde_json::{json, Value};

use crate::tree::PropertyTree;

/// A caught error, reduced to what ends up under the `error` key of a log
/// line: its kind, its description and, when known, the frames that led to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub kind: String,
    pub message: String,
    /// Frames ordered from the capture site outwards.
    pub stack_trace: Option<Vec<String>>,
}

impl Fault {
    /// Describe an error without any frame information.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            stack_trace: None,
        }
    }

    /// Describe `error` using its concrete type name as the kind.
    pub fn from_error<E>(error: &E) -> Self
    where
        E: Error + ?Sized,
    {
        Self::new(error_kind(error), error.to_string())
    }

    /// Like [`Fault::from_error`], but also records where the error was
    /// caught.
    ///
    /// The first frame is always the caller's source location. When the
    /// process has backtraces enabled (`RUST_BACKTRACE` / `RUST_LIB_BACKTRACE`)
    /// the symbolized frames of the current thread follow it.
    #[track_caller]
    pub fn capture<E>(error: &E) -> Self
    where
        E: Error + ?Sized,
    {
        let location = Location::caller();
        let mut frames = vec![format!("{}:{}:{}", location.file(), location.line(), location.column())];

        let backtrace = Backtrace::capture();
        if backtrace.status() == BacktraceStatus::Captured {
            frames.extend(caller_frames(backtrace_frames(&backtrace)));
        }

        Self {
            stack_trace: Some(frames),
            ..Self::from_error(error)
        }
    }

    /// Attach explicit frames, replacing any recorded ones.
    pub fn with_stack_trace<I, S>(mut self, frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let frames: Vec<String> = frames.into_iter().map(Into::into).collect();
        self.stack_trace = if frames.is_empty() { None } else { Some(frames) };
        self
    }

    /// Render as `{error: {type, message, stack_trace?}}`.
    ///
    /// Never fails; without frames the `stack_trace` key is left out.
    pub fn serialize(&self) -> PropertyTree {
        let mut error = PropertyTree::new();
        error.insert("type".to_string(), Value::String(self.kind.clone()));
        error.insert("message".to_string(), Value::String(self.message.clone()));
        if let Some(frames) = &self.stack_trace {
            error.insert("stack_trace".to_string(), json!(frames));
        }

        let mut fields = PropertyTree::new();
        fields.insert("error".to_string(), Value::Object(error));
        fields
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Short type name of `error`. Trait objects have no useful static name, so
/// for those the leading identifier of the `Debug` output is used instead
/// (`ParseIntError { kind: InvalidDigit }` gives `ParseIntError`).
fn error_kind<E>(error: &E) -> String
where
    E: Error + ?Sized,
{
    let static_name = short_type_name(std::any::type_name::<E>());
    if !static_name.starts_with("dyn ") {
        return static_name;
    }
    let debug = format!("{:?}", error);
    let ident: String = debug.chars().take_while(|c| c.is_alphanumeric() || *c == '_').collect();
    if ident.is_empty() {
        static_name
    } else {
        ident
    }
}

/// Drop the frames of the capture machinery itself, keeping what follows the
/// last of them.
fn caller_frames(frames: Vec<String>) -> Vec<String> {
    let internal = |frame: &String| {
        frame.contains("Fault::capture") || frame.contains("std::backtrace") || frame.contains("backtrace_rs")
    };
    match frames.iter().rposition(internal) {
        Some(last) => frames.into_iter().skip(last + 1).collect(),
        None => frames,
    }
}

/// Strip module paths from a type name while keeping generic arguments
/// readable: `core::num::error::ParseIntError` becomes `ParseIntError`.
fn short_type_name(full: &str) -> String {
    let mut short = String::with_capacity(full.len());
    let mut segment = String::new();
    for ch in full.chars() {
        match ch {
            ':' => segment.clear(),
            '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | '&' | ';' => {
                short.push_str(&segment);
                segment.clear();
                short.push(ch);
            }
            _ => segment.push(ch),
        }
    }
    short.push_str(&segment);
    short
}

/// Turn the textual backtrace into one line per frame: `symbol at file:line`.
fn backtrace_frames(backtrace: &Backtrace) -> Vec<String> {
    let rendered = backtrace.to_string();
    let mut frames: Vec<String> = Vec::new();
    for line in rendered.lines().map(str::trim) {
        if let Some(location) = line.strip_prefix("at ") {
            if let Some(last) = frames.last_mut() {
                last.push_str(" at ");
                last.push_str(location);
            }
        } else if let Some((index, symbol)) = line.split_once(": ") {
            if index.chars().all(|c| c.is_ascii_digit()) {
                frames.push(symbol.to_string());
            }
        }
    }
    frames
}
