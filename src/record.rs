use serde::Serialize;
use serde_json::Value;

use crate::tree::{get_path, PropertyTree};

/// A fully merged, expanded and validated log entry, ready to be written.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LogRecord {
    pub fields: PropertyTree,
}

impl LogRecord {
    pub fn new(fields: PropertyTree) -> Self {
        Self { fields }
    }

    pub fn message(&self) -> Option<&str> {
        self.fields.get("message").and_then(Value::as_str)
    }

    pub fn level(&self) -> Option<&str> {
        self.get("log.level").and_then(Value::as_str)
    }

    /// Look up a nested field by its dotted path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        get_path(&self.fields, path)
    }

    /// Serialize to a single JSON line, terminated by `\n`.
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}
