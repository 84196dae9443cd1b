//! Error types for bulk-certs
//!
//! This module provides the error taxonomy for the issuance pipeline:
//! - [`StageError`] - a per-record failure at one pipeline stage, recorded as an outcome
//! - [`DatabaseError`] - ledger persistence failures
//! - [`ArchiveError`] - failures while bundling a job directory
//! - [`Error`] - the crate-wide error returned from fallible operations

use crate::types::{Record, Stage};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for bulk-certs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for bulk-certs
///
/// Per-record failures never surface through this type while a batch is
/// running; they are captured as [`StageError`] outcomes instead. Variants
/// here abort the operation that returned them.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "batch.max_concurrent_records")
        key: Option<String>,
    },

    /// Ledger operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error outside of a pipeline stage (client construction, etc.)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Summary file could not be written
    #[error("summary error: {0}")]
    Csv(#[from] csv::Error),

    /// Job directory could not be archived
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// A pipeline stage failed
    #[error("stage failure: {0}")]
    Stage(#[from] StageError),

    /// Submitted records or job state rejected
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Job not found
    #[error("job not found: {0}")]
    NotFound(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error came from the durable job ledger.
    ///
    /// Ledger failures are fatal for a run and must be surfaced to an operator.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Error::Database(_) | Error::Sqlx(_))
    }
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Record not found
    #[error("record not found: {0}")]
    NotFound(String),
}

/// Archive-related errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The directory to archive does not exist
    #[error("source directory {0} does not exist")]
    SourceMissing(PathBuf),

    /// Writing the archive failed
    #[error("failed to write archive {path}: {reason}")]
    Write {
        /// Archive path being written
        path: PathBuf,
        /// The reason the write failed
        reason: String,
    },
}

/// Why a single pipeline stage failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageCause {
    /// Network failure or timeout talking to a remote service
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote service answered with a non-OK response code
    #[error("service responded with {response_code}")]
    Rejected {
        /// Response code reported by the service (e.g. "CLIENT_ERROR" or an HTTP status)
        response_code: String,
    },

    /// The service answered OK but a required field was missing
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Writing the downloaded artifact to disk failed
    #[error("write error: {0}")]
    Io(String),
}

impl StageCause {
    /// Classify a reqwest error as a transport failure, calling out timeouts.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            StageCause::Transport(format!("request timed out: {err}"))
        } else if err.is_connect() {
            StageCause::Transport(format!("connection failed: {err}"))
        } else {
            StageCause::Transport(err.to_string())
        }
    }
}

/// Failure of one record's pipeline at a specific stage.
///
/// Carries the original row index and the record itself so the failure can
/// be traced back to the uploaded input.
#[derive(Debug, Clone, Error)]
#[error("{stage} stage failed for row {index} ({}): {cause}", .record.name)]
pub struct StageError {
    /// Stage at which the pipeline stopped
    pub stage: Stage,
    /// Zero-based index of the record in the submitted list
    pub index: usize,
    /// The record that failed
    pub record: Record,
    /// Underlying cause
    pub cause: StageCause,
}
