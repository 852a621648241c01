//! Error types for the SQLite model engine.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the engine, its configuration and the hydration step.
///
/// Store failures are never retried or recovered; they surface through
/// [`Error::Sqlite`] exactly as rusqlite reported them.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to open database at {location}: {source}")]
    Connection {
        location: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("engine connection is closed")]
    Closed,

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid schema for model {model}: {reason}")]
    Schema { model: String, reason: String },

    #[error("model {model} has no field named {field}")]
    UnknownField { model: String, field: String },

    #[error("instance of {model} has already been deleted")]
    Deleted { model: String },

    #[error("empty opaque payload")]
    EmptyPayload,

    #[error("unsupported opaque payload version {0}")]
    UnsupportedPayloadVersion(u8),

    #[error("opaque value contains a NaN or infinite number")]
    NonFiniteNumber,

    #[error("malformed opaque payload: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("row has {found} values but model {model} declares {expected} fields")]
    RowShape {
        model: String,
        expected: usize,
        found: usize,
    },

    #[error("value for field {field} cannot be converted: {reason}")]
    Conversion { field: String, reason: String },

    #[error("failed to remove database file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
