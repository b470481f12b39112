use std::path::PathBuf;
use thiserror::Error;

/// Failures reported by a [`Repository`](crate::store::Repository)
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store itself is unusable; the running pass must stop
    #[error("store connection failed: {0}")]
    Connection(String),

    /// A single read or write failed; later operations may still succeed
    #[error("store operation failed: {0}")]
    Query(String),

    #[error("failed to encode record column: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Connection(_))
    }
}

/// Why a single dump line was skipped
#[derive(Debug, Error)]
pub enum LineError {
    #[error("no JSON object on line")]
    Extract,

    #[error("line is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected record shape: {0}")]
    Shape(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LineError {
    pub(crate) fn shape(msg: impl Into<String>) -> Self {
        LineError::Shape(msg.into())
    }
}

/// Errors that abort a whole pass
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open dump file {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read line {line} of dump")]
    Read {
        line: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("store became unavailable at line {line}")]
    StoreUnavailable {
        line: usize,
        #[source]
        source: StoreError,
    },
}
