//! Error taxonomy, one enum per pipeline stage.

use thiserror::Error;

/// Error types for the snapshot download step.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport-level failure (connect, timeout, body read).
    #[error("snapshot request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("snapshot server returned {0}")]
    Status(reqwest::StatusCode),

    /// Staging the downloaded bytes on disk failed.
    #[error("failed to stage downloaded snapshot: {0}")]
    Io(#[from] std::io::Error),
}

/// Error types for the snapshot decompression step.
#[derive(Error, Debug)]
pub enum DecompressError {
    /// Read, write, or gzip format failure while streaming.
    #[error("failed to decompress snapshot: {0}")]
    Io(#[from] std::io::Error),

    /// The decompressed file could not be renamed over the dataset.
    #[error("failed to install decompressed snapshot: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Umbrella error for a failed refresh cycle.
///
/// Caught at the coordinator boundary and converted into a reset to idle
/// plus a failure signal for the request that ran the cycle; never allowed
/// to crash a request handler.
#[derive(Error, Debug)]
pub enum RefreshError {
    /// The download step failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The decompression step failed.
    #[error(transparent)]
    Decompress(#[from] DecompressError),

    /// Local file metadata could not be read during the freshness check.
    #[error("failed to inspect local snapshot: {0}")]
    Io(#[from] std::io::Error),

    /// The background refresh task panicked or was aborted.
    #[error("refresh task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Error types for building and executing dataset queries.
#[derive(Error, Debug)]
pub enum QueryError {
    /// A requested field is not in the allow-list.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// Administrative level outside the supported 1..=3 range.
    #[error("invalid administrative level: {0}")]
    InvalidLevel(u8),

    /// A location filter needs a level to name its column.
    #[error("location filter requires a level")]
    LocationWithoutLevel,

    /// Date filter not in YYYY-MM-DD form.
    #[error("invalid date {value:?}: {source}")]
    InvalidDate {
        value: String,
        source: chrono::ParseError,
    },

    /// SQL execution error.
    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),
}
