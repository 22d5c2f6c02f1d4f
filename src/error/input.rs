//! Failure values handed to the classifier.
//!
//! Step executors fail with whatever they have at hand: a Rust error, a bare
//! string, a JSON body from a provider, or nothing at all. [`ErrorInput`]
//! captures all of these so the classifier can always produce a message.

use serde::Serialize;
use serde_json::Value;

use super::classification::UNKNOWN_ERROR_MESSAGE;

/// A failure value of unknown shape.
#[derive(Clone, Debug, PartialEq)]
pub enum ErrorInput {
    /// A structured error with a message and, optionally, a stack trace.
    Error {
        message: String,
        stack: Option<String>,
    },
    /// A bare string.
    Text(String),
    /// An arbitrary value. Classified by its JSON text, even when it looks
    /// like an error object.
    Value(Value),
    /// A value that could not be serialized.
    Unserializable,
    /// Nothing was provided.
    Null,
}

impl ErrorInput {
    /// Builds a structured error input.
    pub fn error(message: impl Into<String>) -> Self {
        ErrorInput::Error {
            message: message.into(),
            stack: None,
        }
    }

    /// Attaches a stack trace. Only structured errors carry stacks; other
    /// variants are returned unchanged.
    pub fn with_stack(self, stack: impl Into<String>) -> Self {
        match self {
            ErrorInput::Error { message, .. } => {
                let stack = stack.into();
                ErrorInput::Error {
                    message,
                    stack: (!stack.is_empty()).then_some(stack),
                }
            }
            other => other,
        }
    }

    /// Builds a structured error from a Rust error, joining its source chain
    /// with `": "`.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        ErrorInput::Error {
            message,
            stack: None,
        }
    }

    /// Serializes any value. A serialization failure is kept as
    /// [`ErrorInput::Unserializable`] rather than reported.
    pub fn serialized<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => ErrorInput::from(value),
            Err(_) => ErrorInput::Unserializable,
        }
    }

    /// Extracts the human-readable message.
    ///
    /// Falls back to [`UNKNOWN_ERROR_MESSAGE`] when the failure is null,
    /// unserializable, or yields only whitespace.
    pub fn message(&self) -> String {
        let message = match self {
            ErrorInput::Error { message, .. } => Some(message.clone()),
            ErrorInput::Text(text) => Some(text.clone()),
            ErrorInput::Value(value) => message_from_value(value),
            ErrorInput::Unserializable | ErrorInput::Null => None,
        };

        match message {
            Some(message) if !message.trim().is_empty() => message,
            _ => UNKNOWN_ERROR_MESSAGE.to_string(),
        }
    }

    /// The stack trace, present only for structured errors that carry one.
    pub fn stack(&self) -> Option<String> {
        match self {
            ErrorInput::Error { stack, .. } => stack.clone().filter(|s| !s.is_empty()),
            _ => None,
        }
    }
}

fn message_from_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => serde_json::to_string(other).ok(),
    }
}

impl From<&str> for ErrorInput {
    fn from(text: &str) -> Self {
        ErrorInput::Text(text.to_string())
    }
}

impl From<String> for ErrorInput {
    fn from(text: String) -> Self {
        ErrorInput::Text(text)
    }
}

impl From<Value> for ErrorInput {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ErrorInput::Null,
            Value::String(text) => ErrorInput::Text(text),
            other => ErrorInput::Value(other),
        }
    }
}

impl<T: Into<ErrorInput>> From<Option<T>> for ErrorInput {
    fn from(value: Option<T>) -> Self {
        value.map_or(ErrorInput::Null, Into::into)
    }
}

impl From<std::io::Error> for ErrorInput {
    fn from(err: std::io::Error) -> Self {
        ErrorInput::from_error(&err)
    }
}
