use std::fmt;
use std::sync::Arc;

use jsonschema::error::{TypeKind, ValidationErrorKind};
use jsonschema::JSONSchema;
use serde_json::{json, Value};

use crate::tree::PropertyTree;

/// A JSON Schema document describing what a log line must contain,
/// compiled once when it is created.
#[derive(Clone)]
pub struct ValidationSchema {
    document: Value,
    compiled: Arc<JSONSchema>,
}

/// Errors raised while reading a schema document.
#[derive(thiserror::Error, Debug)]
pub enum SchemaError {
    #[error("validation schema is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("validation schema must be a JSON object")]
    NotAnObject,

    #[error("validation schema does not compile: {0}")]
    Compile(String),
}

impl ValidationSchema {
    pub fn new(document: Value) -> Result<Self, SchemaError> {
        if !document.is_object() {
            return Err(SchemaError::NotAnObject);
        }
        let compiled = JSONSchema::options()
            .compile(&document)
            .map_err(|e| SchemaError::Compile(e.to_string()))?;
        Ok(Self {
            document,
            compiled: Arc::new(compiled),
        })
    }

    pub fn from_json_str(source: &str) -> Result<Self, SchemaError> {
        Self::new(serde_json::from_str(source)?)
    }

    /// The built-in schema: a non-empty `message` string is required.
    pub fn message_schema() -> Result<Self, SchemaError> {
        Self::new(json!({
            "type": "object",
            "required": ["message"],
            "properties": {
                "message": {
                    "type": "string",
                    "minLength": 1
                }
            }
        }))
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    /// First violation of `instance`, if any.
    fn first_violation(&self, instance: &Value) -> Option<ValidationError> {
        let mut errors = self.compiled.validate(instance).err()?;
        errors.next().map(|error| ValidationError {
            pointer: format!("#{}", error.instance_path),
            kind: ViolationKind::from_error(&error.kind, &error.instance, &error.to_string()),
        })
    }
}

impl fmt::Debug for ValidationSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationSchema").field("document", &self.document).finish_non_exhaustive()
    }
}

impl PartialEq for ValidationSchema {
    fn eq(&self, other: &Self) -> bool {
        self.document == other.document
    }
}

/// What was wrong with the offending value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    TypeMismatch { expected: Vec<String>, found: &'static str },
    MissingProperty(String),
    TooShort { min: u64 },
    TooLong { max: u64 },
    NotInEnum,
    /// Any other keyword; carries the engine's description.
    Other(String),
}

impl ViolationKind {
    fn from_error(kind: &ValidationErrorKind, instance: &Value, description: &str) -> Self {
        match kind {
            ValidationErrorKind::Type { kind } => ViolationKind::TypeMismatch {
                expected: match kind {
                    TypeKind::Single(primitive) => vec![primitive.to_string()],
                    TypeKind::Multiple(primitives) => {
                        (*primitives).into_iter().map(|primitive| primitive.to_string()).collect()
                    }
                },
                found: type_name(instance),
            },
            ValidationErrorKind::Required { property } => ViolationKind::MissingProperty(
                property.as_str().map(str::to_string).unwrap_or_else(|| property.to_string()),
            ),
            ValidationErrorKind::MinLength { limit } => ViolationKind::TooShort { min: *limit },
            ValidationErrorKind::MaxLength { limit } => ViolationKind::TooLong { max: *limit },
            ValidationErrorKind::Enum { .. } => ViolationKind::NotInEnum,
            _ => ViolationKind::Other(description.to_string()),
        }
    }
}

/// A schema violation, located by a JSON-pointer-like path (`#/pet/name`).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", describe(.pointer, .kind))]
pub struct ValidationError {
    pub pointer: String,
    pub kind: ViolationKind,
}

fn describe(pointer: &str, kind: &ViolationKind) -> String {
    match kind {
        ViolationKind::TypeMismatch { expected, found } => format!(
            "The property '{}' of type {} did not match the following type: {}",
            pointer,
            found,
            expected.join(", ")
        ),
        ViolationKind::MissingProperty(name) => {
            format!("The property '{}' did not contain a required property of '{}'", pointer, name)
        }
        ViolationKind::TooShort { min } => {
            format!("The property '{}' was not of a minimum string length of {}", pointer, min)
        }
        ViolationKind::TooLong { max } => {
            format!("The property '{}' was not of a maximum string length of {}", pointer, max)
        }
        ViolationKind::NotInEnum => {
            format!("The property '{}' did not match one of the allowed values", pointer)
        }
        ViolationKind::Other(description) => format!("The property '{}' is invalid: {}", pointer, description),
    }
}

/// Decides what happens to a validation error: `Ok(())` swallows it, `Err`
/// fails the log call with the returned error.
pub type ValidationErrorHandler =
    Arc<dyn Fn(ValidationError) -> Result<(), ValidationError> + Send + Sync>;

/// Outcome of a validation that did not fail the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    /// The tree was invalid and the handler swallowed the error.
    Swallowed,
}

/// Checks canonical trees against a [`ValidationSchema`], routing failures
/// through a replaceable handler. The initial handler propagates.
#[derive(Clone)]
pub struct SchemaValidator {
    schema: Arc<ValidationSchema>,
    handler: ValidationErrorHandler,
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator").field("schema", &self.schema).finish_non_exhaustive()
    }
}

impl SchemaValidator {
    pub fn new(schema: ValidationSchema) -> Self {
        Self {
            schema: Arc::new(schema),
            handler: Arc::new(propagate),
        }
    }

    pub fn schema(&self) -> &ValidationSchema {
        &self.schema
    }

    /// Same handler, different schema.
    pub fn with_schema(&self, schema: ValidationSchema) -> Self {
        Self {
            schema: Arc::new(schema),
            handler: Arc::clone(&self.handler),
        }
    }

    /// Same schema, different handler.
    pub fn with_handler<F>(&self, handler: F) -> Self
    where
        F: Fn(ValidationError) -> Result<(), ValidationError> + Send + Sync + 'static,
    {
        Self {
            schema: Arc::clone(&self.schema),
            handler: Arc::new(handler),
        }
    }

    /// Validate `tree` and apply the handler to the first violation found.
    pub fn validate(&self, tree: &PropertyTree) -> Result<Verdict, ValidationError> {
        match self.check(tree) {
            Ok(()) => Ok(Verdict::Valid),
            Err(violation) => {
                (self.handler)(violation)?;
                Ok(Verdict::Swallowed)
            }
        }
    }

    /// Validate without involving the handler.
    pub fn check(&self, tree: &PropertyTree) -> Result<(), ValidationError> {
        let instance = Value::Object(tree.clone());
        match self.schema.first_violation(&instance) {
            Some(violation) => Err(violation),
            None => Ok(()),
        }
    }
}

fn propagate(error: ValidationError) -> Result<(), ValidationError> {
    Err(error)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tree(value: Value) -> PropertyTree {
        crate::tree::into_tree(value).unwrap()
    }

    fn message_validator() -> SchemaValidator {
        SchemaValidator::new(ValidationSchema::message_schema().unwrap())
    }

    fn pet_schema() -> ValidationSchema {
        ValidationSchema::from_json_str(
            r#"{
                "type": "object",
                "required": ["pet"],
                "properties": {
                    "pet": {
                        "type": "object",
                        "required": ["name", "best_boy_or_girl?"],
                        "properties": {
                            "name": { "type": "string", "minLength": 1 },
                            "best_boy_or_girl?": { "type": "boolean" }
                        }
                    }
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn passes_conforming_tree() {
        let validator = message_validator();
        let verdict = validator.validate(&tree(json!({"message": "this is my message", "foo": "bar"})));
        assert_eq!(verdict.unwrap(), Verdict::Valid);
    }

    #[test]
    fn default_handler_propagates() {
        let validator = message_validator();
        let err = validator.validate(&tree(json!({"message": true}))).unwrap_err();
        assert_eq!(err.pointer, "#/message");
        assert_eq!(
            err.to_string(),
            "The property '#/message' of type boolean did not match the following type: string"
        );
    }

    #[test]
    fn default_schema_requires_non_empty_message() {
        let validator = message_validator();
        let err = validator.check(&tree(json!({"message": ""}))).unwrap_err();
        assert_eq!(err.kind, ViolationKind::TooShort { min: 1 });

        let err = validator.check(&tree(json!({"foo": "bar"}))).unwrap_err();
        assert_eq!(err.kind, ViolationKind::MissingProperty("message".into()));
    }

    #[test]
    fn swallowing_handler_is_called_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let validator = message_validator().with_handler(move |_err| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let verdict = validator.validate(&tree(json!({"message": true}))).unwrap();
        assert_eq!(verdict, Verdict::Swallowed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handler_may_escalate_a_different_error() {
        let validator = message_validator().with_handler(|err| {
            Err(ValidationError { pointer: format!("{} (escalated)", err.pointer), ..err })
        });
        let err = validator.validate(&tree(json!({"message": 1}))).unwrap_err();
        assert_eq!(err.pointer, "#/message (escalated)");
    }

    #[test]
    fn nested_required_properties() {
        let validator = SchemaValidator::new(pet_schema());
        assert!(validator.check(&tree(json!({"pet": {"name": "Davis", "best_boy_or_girl?": true}}))).is_ok());

        let err = validator.check(&tree(json!({"pet": {"name": "Davis"}}))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "The property '#/pet' did not contain a required property of 'best_boy_or_girl?'"
        );
    }

    #[test]
    fn with_schema_keeps_handler() {
        let validator = message_validator().with_handler(|_| Ok(())).with_schema(pet_schema());
        assert_eq!(validator.validate(&tree(json!({"message": "hi"}))).unwrap(), Verdict::Swallowed);
    }

    #[test]
    fn type_unions_enums_and_items() {
        let schema = ValidationSchema::new(json!({
            "type": "object",
            "properties": {
                "trace": { "type": ["string", "null"] },
                "level": { "enum": ["debug", "info"] },
                "tags": { "type": "array", "items": { "type": "string", "maxLength": 3 } },
                "count": { "type": "integer" }
            }
        }))
        .unwrap();
        let validator = SchemaValidator::new(schema);

        assert!(validator.check(&tree(json!({"trace": null, "level": "info", "tags": ["a"], "count": 2}))).is_ok());
        assert_eq!(
            validator.check(&tree(json!({"level": "warn"}))).unwrap_err().kind,
            ViolationKind::NotInEnum
        );
        let err = validator.check(&tree(json!({"tags": ["ok", "toolong"]}))).unwrap_err();
        assert_eq!(err.pointer, "#/tags/1");
        assert_eq!(
            validator.check(&tree(json!({"count": 1.5}))).unwrap_err().kind,
            ViolationKind::TypeMismatch { expected: vec!["integer".into()], found: "number" }
        );
    }

    #[test]
    fn rejects_non_object_schema_documents() {
        assert!(matches!(ValidationSchema::new(json!([1])), Err(SchemaError::NotAnObject)));
        assert!(matches!(ValidationSchema::from_json_str("{"), Err(SchemaError::Parse(_))));
        assert!(matches!(
            ValidationSchema::new(json!({"type": "no-such-type"})),
            Err(SchemaError::Compile(_))
        ));
    }

    #[test]
    fn enforces_keywords_beyond_types_and_required() {
        let validator = SchemaValidator::new(
            ValidationSchema::new(json!({
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "message": { "type": "string", "pattern": "^[a-z]+$" },
                    "count": { "type": "integer", "minimum": 0 }
                }
            }))
            .unwrap(),
        );

        assert!(validator.check(&tree(json!({"message": "fine", "count": 3}))).is_ok());

        let err = validator.check(&tree(json!({"message": "fine", "extra": 1}))).unwrap_err();
        assert_eq!(err.pointer, "#");
        assert!(matches!(err.kind, ViolationKind::Other(_)));

        let err = validator.check(&tree(json!({"message": "UPPER 123"}))).unwrap_err();
        assert_eq!(err.pointer, "#/message");

        let err = validator.check(&tree(json!({"message": "fine", "count": -5}))).unwrap_err();
        assert_eq!(err.pointer, "#/count");
        assert!(err.to_string().starts_with("The property '#/count' is invalid: "));
    }
}
