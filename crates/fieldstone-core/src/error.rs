use derive_more::{Deref, DerefMut};
use thiserror::Error as ThisError;

///
/// EngineError
///
/// Configuration-time failures are fatal and returned synchronously from
/// `add`/`register`; they indicate a programming mistake, not a runtime
/// condition. Backend failures pass through unchanged — retries, if any,
/// belong to the persistence collaborator.
///

#[derive(Debug, ThisError)]
pub enum EngineError {
    #[error("unknown field type '{type_id}' at {list}.{path}")]
    UnknownFieldType {
        list: String,
        path: String,
        type_id: String,
    },

    #[error("list '{0}' is not registered")]
    ListNotRegistered(String),

    #[error("list '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("unknown filter path '{path}' on list '{list}'")]
    UnknownFilterPath { list: String, path: String },

    #[error("relationship {list}.{path} references unknown list '{target}'")]
    UnresolvedReference {
        list: String,
        path: String,
        target: String,
    },

    #[error("no unique value found for '{path}' from '{base}' after {attempts} attempts")]
    UniqueValueExhausted {
        path: String,
        base: String,
        attempts: u32,
    },

    #[error("validation failed on '{field}': {reason}")]
    ValidationFailed { field: String, reason: String },

    #[error("field {list}.{path} is invalid: {reason}")]
    InvalidFieldOptions {
        list: String,
        path: String,
        reason: String,
    },

    #[error("no such operation '{op}' on field '{path}'")]
    UnknownOperation { path: String, op: String },

    #[error("no relationship at {list}.{path}")]
    UnknownRelationship { list: String, path: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

///
/// BackendError
///
/// Opaque pass-through for persistence collaborator failures. The engine
/// never inspects the message; it only propagates it.
///

#[derive(Debug, ThisError)]
#[error("backend error: {message}")]
pub struct BackendError {
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

///
/// ValidationFailure
///
/// Per-document validation failures are data, not errors: one form
/// submission aggregates every failing field instead of stopping at the
/// first one.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidationFailure {
    pub field: String,
    pub reason: String,
}

impl ValidationFailure {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

///
/// ValidationFailures
/// Every failing field from one submission, in field order.
///

#[repr(transparent)]
#[derive(Clone, Debug, Default, Deref, DerefMut, Eq, PartialEq)]
pub struct ValidationFailures(pub Vec<ValidationFailure>);

impl std::fmt::Display for ValidationFailures {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

///
/// TESTS
///
