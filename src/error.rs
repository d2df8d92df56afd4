//! Error taxonomy for request handling.
//!
//! Every failure is surfaced once: validation and configuration errors are
//! reported before any query runs, query errors come from the dataset layer,
//! and transport errors abort a stream that has already started.

use std::io;

use thiserror::Error;

use crate::value::Value;

/// Errors raised while validating, composing, executing or encoding a request.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing request parameters.
    #[error("{message}")]
    Validation { message: String },

    /// A predicate key that is not registered.
    #[error("Unknown query key: {key}")]
    UnknownPredicate { key: String },

    /// A lookup field selection naming fields that do not exist.
    #[error("invalid select")]
    InvalidSelect { options: Vec<String> },

    /// The dataset rejected or failed a query.
    #[error("query failed: {0}")]
    Query(#[from] rusqlite::Error),

    /// A candidate set could not be serialised for the dataset.
    #[error("failed to serialize candidate set: {0}")]
    Json(#[from] serde_json::Error),

    /// The sink stopped accepting output.
    #[error("write failed: {0}")]
    Transport(#[from] io::Error),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    /// True for errors caused by the caller's input (the 4xx family).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Validation { .. } | Error::UnknownPredicate { .. } | Error::InvalidSelect { .. }
        )
    }

    /// True when the sink failed; nothing more can be written for the request.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    /// The `{"error": {"message": ...}}` document reported for this error.
    pub fn envelope(&self) -> Value {
        let mut body = vec![("message".to_string(), Value::String(self.to_string()))];
        if let Error::InvalidSelect { options } = self {
            body.push((
                "options".to_string(),
                Value::Array(options.iter().cloned().map(Value::String).collect()),
            ));
        }
        Value::Object(vec![("error".to_string(), Value::Object(body))])
    }
}

/// Result type for request handling.
pub type Result<T> = std::result::Result<T, Error>;
