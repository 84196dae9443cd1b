//! Database layer for bulk-certs
//!
//! SQLite persistence for the job ledger.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] — Database lifecycle, schema migrations
//! - [`jobs`] — Job CRUD and the [`JobLedger`](crate::ledger::JobLedger) implementation

use crate::error::Result;
use crate::types::{JobStatus, Record};
use chrono::{DateTime, TimeZone, Utc};
use sqlx::{FromRow, sqlite::SqlitePool};

mod jobs;
mod migrations;

/// Job record from database
#[derive(Debug, Clone, FromRow)]
pub struct Job {
    /// Unique database ID
    pub id: i64,
    /// Kind of object being issued (e.g. "certificate")
    pub object_type: String,
    /// Certificate type selected at upload
    pub cert_type: String,
    /// Organisation the upload belongs to
    pub organisation_id: Option<String>,
    /// Uploading user
    pub uploaded_by: Option<String>,
    /// JSON array of uploaded rows
    pub data: String,
    /// Lifecycle status (0=created, 1=running, 2=completed)
    pub status: i32,
    /// Retry counter
    pub retry_count: i32,
    /// JSON array of successful records
    pub success_result: Option<String>,
    /// JSON array of failed records
    pub failure_result: Option<String>,
    /// Archive location
    pub storage_details: Option<String>,
    /// Unix timestamp when the job was created
    pub created_at: i64,
    /// Unix timestamp when the last run started
    pub process_start_time: Option<i64>,
    /// Unix timestamp when the last run completed
    pub process_end_time: Option<i64>,
    /// Unix timestamp of the last ledger write
    pub last_updated_on: i64,
}

impl Job {
    /// Decoded lifecycle status, `None` for unknown codes
    pub fn job_status(&self) -> Option<JobStatus> {
        JobStatus::from_i32(self.status)
    }

    /// Decode the stored upload rows
    pub fn records(&self) -> Result<Vec<Record>> {
        Ok(serde_json::from_str(&self.data)?)
    }

    /// Run start time as a UTC timestamp
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.process_start_time
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
    }

    /// Run end time as a UTC timestamp
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.process_end_time
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
    }
}

/// Database handle for bulk-certs
pub struct Database {
    pool: SqlitePool,
}
