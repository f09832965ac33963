use serde_json::Value;

use crate::fault::Fault;
use crate::tree::{merge_into, PropertyTree};

pub const MESSAGE_KEY: &str = "message";

/// Anything a log call accepts as its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum LogInput {
    /// Plain text, logged as `{message: text}`.
    Text(String),
    /// A property bag that must carry its own `message`.
    Tree(PropertyTree),
    /// A caught error; its description becomes the message.
    Fault(Fault),
}

impl From<&str> for LogInput {
    fn from(text: &str) -> Self {
        LogInput::Text(text.to_string())
    }
}

impl From<String> for LogInput {
    fn from(text: String) -> Self {
        LogInput::Text(text)
    }
}

impl From<&String> for LogInput {
    fn from(text: &String) -> Self {
        LogInput::Text(text.clone())
    }
}

impl From<PropertyTree> for LogInput {
    fn from(tree: PropertyTree) -> Self {
        LogInput::Tree(tree)
    }
}

impl From<Fault> for LogInput {
    fn from(fault: Fault) -> Self {
        LogInput::Fault(fault)
    }
}

impl TryFrom<Value> for LogInput {
    type Error = MessageError;

    /// Strings and objects are accepted; any other JSON value is rejected.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(text) => Ok(LogInput::Text(text)),
            Value::Object(tree) => Ok(LogInput::Tree(tree)),
            other => Err(MessageError::UnsupportedType(json_kind(&other))),
        }
    }
}

/// Reasons a log call's payload is rejected before anything is written.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    #[error("message must be a string or an object, got {0}")]
    UnsupportedType(&'static str),

    #[error("log object must have a 'message' property")]
    MissingMessageField,

    #[error("the 'message' property of the log object must not be empty")]
    EmptyMessage,
}

/// The normalized payload of a single log call.
///
/// Always holds a `message` key. When that value is a string it is
/// non-empty after trimming; other value types are left for the schema
/// validator to judge.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    content: PropertyTree,
}

impl Message {
    /// Normalize a payload.
    pub fn construct(input: impl Into<LogInput>) -> Result<Self, MessageError> {
        match input.into() {
            LogInput::Text(text) => Self::from_text(text),
            LogInput::Tree(tree) => Self::from_tree(tree),
            LogInput::Fault(fault) => Self::with_fault(None, &fault),
        }
    }

    /// Normalize a payload that comes with an error attached.
    ///
    /// The error is serialized under `error`. The explicit payload supplies
    /// the message text if it has a non-empty one; otherwise the error's own
    /// description is used.
    pub fn with_fault(input: Option<LogInput>, fault: &Fault) -> Result<Self, MessageError> {
        let mut content = match input {
            None => PropertyTree::new(),
            Some(LogInput::Text(text)) => text_tree(text),
            Some(LogInput::Tree(tree)) => tree,
            // The payload's own error is folded in first, the explicit one wins.
            Some(LogInput::Fault(inner)) => inner.serialize(),
        };

        let has_text = match content.get(MESSAGE_KEY) {
            Some(Value::String(text)) => !text.trim().is_empty(),
            Some(_) => true,
            None => false,
        };
        if !has_text {
            content.insert(MESSAGE_KEY.to_string(), Value::String(fault.message.clone()));
        }

        merge_into(&mut content, fault.serialize());
        Self::from_tree(content)
    }

    fn from_text(text: String) -> Result<Self, MessageError> {
        Self::from_tree(text_tree(text))
    }

    fn from_tree(content: PropertyTree) -> Result<Self, MessageError> {
        match content.get(MESSAGE_KEY) {
            None => Err(MessageError::MissingMessageField),
            Some(Value::String(text)) if text.trim().is_empty() => Err(MessageError::EmptyMessage),
            Some(_) => Ok(Self { content }),
        }
    }

    /// The message text, if the `message` value is a string.
    pub fn text(&self) -> Option<&str> {
        self.content.get(MESSAGE_KEY).and_then(Value::as_str)
    }

    pub fn content(&self) -> &PropertyTree {
        &self.content
    }

    pub fn into_tree(self) -> PropertyTree {
        self.content
    }
}

fn text_tree(text: String) -> PropertyTree {
    let mut tree = PropertyTree::new();
    tree.insert(MESSAGE_KEY.to_string(), Value::String(text));
    tree
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree(value: Value) -> PropertyTree {
        crate::tree::into_tree(value).unwrap()
    }

    #[test]
    fn text_becomes_message_field() {
        for text in ["hello, world", "a", "  padded  "] {
            let message = Message::construct(text).unwrap();
            assert_eq!(Value::Object(message.into_tree()), json!({ "message": text }));
        }
    }

    #[test]
    fn tree_is_kept_as_is() {
        let input = tree(json!({"key": "value", "message": "hello, world", "pet.name": "Barker"}));
        let message = Message::construct(input.clone()).unwrap();
        assert_eq!(message.content(), &input);
        assert_eq!(message.text(), Some("hello, world"));
    }

    #[test]
    fn missing_message_field_is_rejected() {
        let err = Message::construct(tree(json!({"foo": "bar"}))).unwrap_err();
        assert_eq!(err, MessageError::MissingMessageField);
    }

    #[test]
    fn blank_messages_are_rejected() {
        for blank in ["", "   ", " \n\t "] {
            assert_eq!(Message::construct(blank).unwrap_err(), MessageError::EmptyMessage);
            assert_eq!(
                Message::construct(tree(json!({ "message": blank }))).unwrap_err(),
                MessageError::EmptyMessage
            );
        }
    }

    #[test]
    fn non_string_message_is_left_to_the_validator() {
        let message = Message::construct(tree(json!({"message": true}))).unwrap();
        assert_eq!(message.text(), None);
    }

    #[test]
    fn unsupported_json_values_are_rejected() {
        assert_eq!(
            LogInput::try_from(json!(42)).unwrap_err(),
            MessageError::UnsupportedType("number")
        );
        assert_eq!(
            LogInput::try_from(json!(["a"])).unwrap_err(),
            MessageError::UnsupportedType("array")
        );
        assert_eq!(LogInput::try_from(json!("hi")).unwrap(), LogInput::Text("hi".into()));
    }

    #[test]
    fn fault_alone_supplies_the_message() {
        let fault = Fault::new("StandardError", "Some error");
        let message = Message::construct(fault).unwrap();
        assert_eq!(
            Value::Object(message.into_tree()),
            json!({"message": "Some error", "error": {"type": "StandardError", "message": "Some error"}})
        );
    }

    #[test]
    fn explicit_text_wins_over_fault_message() {
        let fault = Fault::new("StandardError", "Some error");
        let message = Message::with_fault(Some("Artificially raised".into()), &fault).unwrap();
        assert_eq!(message.text(), Some("Artificially raised"));
        assert_eq!(message.content()["error"]["message"], json!("Some error"));
    }

    #[test]
    fn blank_text_falls_back_to_fault_message() {
        let fault = Fault::new("StandardError", "Some error");
        let message = Message::with_fault(Some("  ".into()), &fault).unwrap();
        assert_eq!(message.text(), Some("Some error"));
    }

    #[test]
    fn fault_merges_into_tree_payload() {
        let fault = Fault::new("Timeout", "upstream").with_stack_trace(["main.rs:1:1"]);
        let payload = tree(json!({"message": "GET /cats", "error": {"code": 504}}));
        let message = Message::with_fault(Some(payload.into()), &fault).unwrap();
        assert_eq!(
            message.content()["error"],
            json!({"code": 504, "type": "Timeout", "message": "upstream", "stack_trace": ["main.rs:1:1"]})
        );
    }

    #[test]
    fn blank_fault_message_without_text_is_rejected() {
        let fault = Fault::new("Unknown", "");
        assert_eq!(Message::construct(fault).unwrap_err(), MessageError::EmptyMessage);
    }
}
