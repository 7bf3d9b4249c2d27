//! Domain error model.
//!
//! Business logic raises [`DomainError`] to signal a rule violation. It carries
//! an optional machine-readable code, a human-readable message (optionally built
//! from a positional template), the template arguments, and a free-form payload
//! for structured context.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::template::{format_positional, is_template};

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Structured payload attached to a [`DomainError`].
pub type ErrorData = BTreeMap<String, JsonValue>;

/// Domain-level error.
///
/// Only the payload (`data`) is mutable after construction. Equality compares
/// code, message and arguments; the payload is ignored.
#[derive(Debug, Error, Clone, Serialize, Deserialize)]
#[error("{message}")]
pub struct DomainError {
    code: Option<String>,
    message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    args: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    data: ErrorData,
}

impl DomainError {
    /// Literal message, no code.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            args: Vec::new(),
            data: ErrorData::new(),
        }
    }

    /// Literal message with an error code.
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            ..Self::new(message)
        }
    }

    /// Message produced from a positional template, no code.
    pub fn from_template<I>(format: &str, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: ToString,
    {
        let args = collect_args(args);
        Self {
            message: format_positional(format, &args),
            args,
            ..Self::new(String::new())
        }
    }

    /// Error code plus a message produced from a positional template.
    pub fn with_code_template<I>(code: impl Into<String>, format: &str, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: ToString,
    {
        Self {
            code: Some(code.into()),
            ..Self::from_template(format, args)
        }
    }

    /// Legacy overload resolution: decides by content whether the first
    /// argument is a code or a template.
    ///
    /// - `code_or_template` contains `{0}`: it is the template, and
    ///   `message_or_format` followed by `args` are its arguments. No code.
    /// - otherwise: it is the code, and `message_or_format` is the message
    ///   (formatted with `args` when any are given).
    ///
    /// Prefer [`with_code`](Self::with_code) / [`from_template`](Self::from_template).
    pub fn resolve<I>(code_or_template: &str, message_or_format: &str, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: ToString,
    {
        let args = collect_args(args);

        if is_template(code_or_template) {
            let mut all = Vec::with_capacity(args.len() + 1);
            all.push(message_or_format.to_owned());
            all.extend(args.iter().cloned());
            return Self {
                message: format_positional(code_or_template, &all),
                args,
                ..Self::new(String::new())
            };
        }

        let message = if args.is_empty() {
            message_or_format.to_owned()
        } else {
            format_positional(message_or_format, &args)
        };

        Self {
            code: Some(code_or_template.to_owned()),
            message,
            args,
            data: ErrorData::new(),
        }
    }

    /// Replace the payload wholesale (builder style).
    pub fn with_data(mut self, data: ErrorData) -> Self {
        self.data = data;
        self
    }

    /// Add one payload entry (builder style).
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn data(&self) -> &ErrorData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut ErrorData {
        &mut self.data
    }

    pub fn set_data(&mut self, data: ErrorData) {
        self.data = data;
    }

    pub fn insert_data(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Option<JsonValue> {
        self.data.insert(key.into(), value.into())
    }

    /// `true` when the error carries exactly this code.
    pub fn has_code(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }
}

impl PartialEq for DomainError {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.message == other.message && self.args == other.args
    }
}

impl Eq for DomainError {}

fn collect_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: ToString,
{
    args.into_iter().map(|a| a.to_string()).collect()
}
