use thiserror::Error;

use crate::geocoding::ServiceStatus;

/// Convenience result type for transform operations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Error type shared by setup, the rate gate, the remote service client and ingestion.
///
/// Row-level failures are never returned to the pipeline; the transforms report them through
/// the [`crate::logging::TransformLogger`] sink and pass the row through.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The operation configuration cannot be used (missing fields, bad types, bad limits).
    #[error("{message}")]
    InvalidConfiguration { message: String },

    /// The remote-service client could not be constructed.
    #[error("Could not construct the maps service. {message}")]
    ServiceSetup { message: String },

    /// The rate gate was closed while (or before) a caller waited on it.
    #[error("rate gate is closed")]
    RateGateClosed,

    /// The remote service answered with a non-OK status.
    #[error("Error from Google MAPS API: {status}")]
    ServiceStatus {
        status: ServiceStatus,
        message: Option<String>,
    },

    /// The input field holds nothing to look up.
    #[error("the input field is empty; nothing to look up")]
    EmptyQuery,

    /// The remote service answered OK but without any result to map.
    #[error("no results for query '{query}'")]
    NoResults { query: String },

    /// Transport failure, or a non-success HTTP status.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response or configuration JSON could not be decoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV ingestion error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// The worker pool could not be built.
    #[error("worker pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// The input does not conform to the schema (missing columns, etc.).
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// A value could not be parsed into the field's [`crate::types::DataType`].
    #[error("failed to parse value at row {row} column '{column}': {message} (raw='{raw}')")]
    ParseError {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },
}

impl TransformError {
    /// Create a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }
}
