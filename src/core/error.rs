//! Error taxonomy shared by the store, services, and CLI
//!
//! Every failure a command can hit falls into one of a handful of buckets.
//! Each bucket has a stable machine code that ends up in the `error.code`
//! field of the JSON envelope.

use miette::Diagnostic;
use serde_json::{json, Value};
use thiserror::Error;

use crate::core::params::ParamError;

/// Convenience alias for fallible library operations
pub type ImsResult<T> = std::result::Result<T, ImsError>;

#[derive(Debug, Error, Diagnostic)]
pub enum ImsError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    InvalidParams(#[from] ParamError),

    #[error("validation failed: {}", .errors.join("; "))]
    #[diagnostic(code(ims::validation), help("fix the listed fields and retry"))]
    Validation { errors: Vec<String> },

    #[error("{collection} '{key}' not found")]
    #[diagnostic(code(ims::not_found))]
    NotFound { collection: String, key: String },

    #[error("unknown method: {0}")]
    #[diagnostic(
        code(ims::unknown_method),
        help("run `ims call --list` to see available methods")
    )]
    UnknownMethod(String),

    #[error("I/O error: {0}")]
    #[diagnostic(code(ims::io))]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    #[diagnostic(code(ims::database))]
    Store(#[from] rusqlite::Error),

    #[error("import failed: {0}")]
    #[diagnostic(code(ims::import))]
    Import(String),

    #[error("invalid JSON: {0}")]
    #[diagnostic(code(ims::json))]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    #[diagnostic(code(ims::other))]
    Other(String),
}

impl ImsError {
    /// Build a validation error from a single message
    pub fn validation(message: impl Into<String>) -> Self {
        ImsError::Validation {
            errors: vec![message.into()],
        }
    }

    pub fn not_found(collection: impl Into<String>, key: impl Into<String>) -> Self {
        ImsError::NotFound {
            collection: collection.into(),
            key: key.into(),
        }
    }

    /// Stable code used in the JSON error envelope
    pub fn code(&self) -> &'static str {
        match self {
            ImsError::InvalidParams(_) => "INVALID_PARAMS",
            ImsError::Validation { .. } => "VALIDATION_FAILED",
            ImsError::NotFound { .. } => "NOT_FOUND",
            ImsError::UnknownMethod(_) => "UNKNOWN_METHOD",
            ImsError::Io(_) => "IO_ERROR",
            ImsError::Store(_) => "DATABASE_ERROR",
            ImsError::Import(_) => "IMPORT_FAILED",
            ImsError::Json(_) => "INVALID_JSON",
            ImsError::Other(_) => "EXECUTION_FAILED",
        }
    }

    /// Structured details for the envelope; `null` when there is nothing extra
    pub fn details(&self) -> Value {
        match self {
            ImsError::InvalidParams(e) => json!({
                "field": e.field,
                "value": e.value,
                "reason": e.reason,
            }),
            ImsError::Validation { errors } => json!(errors),
            ImsError::NotFound { collection, key } => json!({
                "collection": collection,
                "key": key,
            }),
            ImsError::UnknownMethod(method) => json!({ "method": method }),
            _ => Value::Null,
        }
    }

    /// Coarse category used in log lines
    pub fn category(&self) -> &'static str {
        match self {
            ImsError::InvalidParams(_) | ImsError::Validation { .. } | ImsError::Json(_) => {
                "validation"
            }
            ImsError::Io(_) | ImsError::Store(_) | ImsError::Import(_) => "io",
            ImsError::NotFound { .. } | ImsError::UnknownMethod(_) => "lookup",
            ImsError::Other(_) => "unknown",
        }
    }
}
