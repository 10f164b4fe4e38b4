//! Error types for the attribute configuration engine

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Group name → validation message, in selection order
pub type ValidationErrors = IndexMap<String, String>;

/// Raw document text could not be turned into a document
///
/// Recoverable: the caller leaves its editing state untouched and keeps going.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Text is not well-formed JSON
    #[error("Invalid document syntax: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    /// Well-formed, but the root is not an object of groups
    #[error("Document root must be an object of groups, found {found}")]
    NotAnObject { found: &'static str },
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Syntax {
            line: err.line(),
            column: err.column(),
            message: err.to_string(),
        }
    }
}

/// One field-level error returned by the remote document write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<Vec<String>>,
    pub message: String,
}

/// Failure of the external document write, surfaced verbatim
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WriteFailure {
    /// The remote side rejected the write with field-level errors
    #[error("Document write rejected: {}", first_message(.0))]
    Rejected(Vec<FieldError>),

    /// The call itself failed (transport, storage)
    #[error("Document write failed: {0}")]
    Transport(String),
}

fn first_message(errors: &[FieldError]) -> &str {
    errors
        .first()
        .map(|e| e.message.as_str())
        .unwrap_or("unknown error")
}

/// Errors from the persistence gate
#[derive(Error, Debug)]
pub enum SaveError {
    /// One or more selected groups have no filled attribute
    #[error("{} group(s) need at least one filled attribute", .0.len())]
    ValidationFailed(ValidationErrors),

    /// The external write failed; baseline not advanced
    #[error(transparent)]
    ExternalWriteFailed(#[from] WriteFailure),

    /// Another save of the same session has not finished yet
    #[error("A save is already in progress for this session")]
    SaveInProgress,
}

/// Errors from the relational store and catalog collaborators
#[derive(Error, Debug)]
pub enum StoreError {
    /// Entity is not visible to the calling tenant
    #[error("Unauthorized: {entity} {id} does not belong to this tenant")]
    Unauthorized { entity: &'static str, id: String },

    /// Referenced item or entity does not exist
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// Request data rejected before touching storage
    #[error("Invalid data: {0}")]
    Invalid(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn unauthorized(entity: &'static str, id: impl ToString) -> Self {
        Self::Unauthorized {
            entity,
            id: id.to_string(),
        }
    }

    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Errors opening an editing session
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The persisted document exists but is not parseable
    #[error("Persisted document for item {item} is malformed: {source}")]
    MalformedDocument {
        item: String,
        #[source]
        source: ParseError,
    },
}
