//! Job ledger interface.
//!
//! The ledger is the durable record of a job's lifecycle. The pipeline only
//! writes to it at two points: when a job starts running and after the job's
//! archive exists. [`crate::db::Database`] is the SQLite implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;

use crate::db::Job;
use crate::error::Result;
use crate::types::{BatchOutcomes, JobId, JobStatus, Record};

/// Retry counter written when a run starts
pub const RETRY_COUNT_RUNNING: i32 = 1;

/// Retry counter written when a run completes
pub const RETRY_COUNT_TERMINAL: i32 = 3;

/// Object type recorded for certificate uploads
pub const OBJECT_TYPE_CERTIFICATE: &str = "certificate";

/// New job to be inserted into the ledger
#[derive(Debug, Clone)]
pub struct NewJob {
    /// Kind of object being issued
    pub object_type: String,
    /// Certificate type selected at upload
    pub cert_type: String,
    /// Organisation the upload belongs to
    pub organisation_id: Option<String>,
    /// Uploading user
    pub uploaded_by: Option<String>,
    /// Uploaded rows, in input order
    pub records: Vec<Record>,
}

impl NewJob {
    /// A certificate upload with no organisation or uploader metadata
    pub fn certificates(cert_type: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            object_type: OBJECT_TYPE_CERTIFICATE.to_string(),
            cert_type: cert_type.into(),
            organisation_id: None,
            uploaded_by: None,
            records,
        }
    }
}

/// Field changes applied by [`JobLedger::update`]
///
/// `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobUpdate {
    /// New lifecycle status
    pub status: Option<JobStatus>,
    /// New retry counter
    pub retry_count: Option<i32>,
    /// Run start time
    pub process_start_time: Option<DateTime<Utc>>,
    /// Run end time
    pub process_end_time: Option<DateTime<Utc>>,
    /// Serialized success list
    pub success_result: Option<String>,
    /// Serialized failure list
    pub failure_result: Option<String>,
    /// Archive location
    pub storage_details: Option<String>,
}

impl JobUpdate {
    /// Transition to Running at `at`
    pub fn started(at: DateTime<Utc>) -> Self {
        Self {
            status: Some(JobStatus::Running),
            retry_count: Some(RETRY_COUNT_RUNNING),
            process_start_time: Some(at),
            ..Default::default()
        }
    }

    /// Transition to Completed with the run's results and archive location
    pub fn completed(outcomes: &BatchOutcomes, archive: &Path, at: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            status: Some(JobStatus::Completed),
            retry_count: Some(RETRY_COUNT_TERMINAL),
            process_end_time: Some(at),
            success_result: Some(serde_json::to_string(&outcomes.success_results())?),
            failure_result: Some(serde_json::to_string(&outcomes.failure_results())?),
            storage_details: Some(archive.to_string_lossy().into_owned()),
            ..Default::default()
        })
    }
}

/// Durable store of job lifecycle and results
#[async_trait]
pub trait JobLedger: Send + Sync {
    /// Insert a job with status Created and return its id
    async fn create(&self, job: &NewJob) -> Result<JobId>;

    /// Apply field changes to a job as one atomic write
    async fn update(&self, id: JobId, changes: &JobUpdate) -> Result<()>;

    /// Read a job back (operator queries and resubmission only)
    async fn get(&self, id: JobId) -> Result<Option<Job>>;
}
