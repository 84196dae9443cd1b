//! Core types for bulk-certs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, StageError};

/// Unique identifier for a bulk-upload job
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub i64);

impl JobId {
    /// Create a new JobId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for JobId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<JobId> for i64 {
    fn from(id: JobId) -> Self {
        id.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

// Implement sqlx Type, Encode, and Decode for database operations
impl sqlx::Type<sqlx::Sqlite> for JobId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for JobId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for JobId {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let id = <i64 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(id))
    }
}

/// Job lifecycle status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Upload accepted, pipeline not yet started
    Created,
    /// Records are being processed
    Running,
    /// Archive written and results recorded
    Completed,
}

impl JobStatus {
    /// Convert a stored integer status code to a JobStatus
    ///
    /// Returns `None` for codes this crate never writes.
    pub fn from_i32(status: i32) -> Option<Self> {
        match status {
            0 => Some(JobStatus::Created),
            1 => Some(JobStatus::Running),
            2 => Some(JobStatus::Completed),
            _ => None,
        }
    }

    /// Convert JobStatus to its stored integer status code
    pub fn to_i32(&self) -> i32 {
        match self {
            JobStatus::Created => 0,
            JobStatus::Running => 1,
            JobStatus::Completed => 2,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Created => "created",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Per-record pipeline stage
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Certificate generation
    Generate,
    /// Registry add
    Register,
    /// Signed download link
    Sign,
    /// Artifact download to local storage
    Fetch,
}

impl Stage {
    /// Stage name as written to logs, summaries and the ledger
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Generate => "generate",
            Stage::Register => "register",
            Stage::Sign => "sign",
            Stage::Fetch => "fetch",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of an uploaded batch.
///
/// `fields` holds every column of the row, including the name column; `name`
/// is the trimmed value of the column whose header is `name` in any case.
/// Serializes as the plain column map so stored rows look like the upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, String>",
    into = "BTreeMap<String, String>"
)]
pub struct Record {
    /// Display name of the recipient
    pub name: String,
    /// All columns of the row
    pub fields: BTreeMap<String, String>,
}

impl Record {
    /// Build a record from row columns.
    ///
    /// Fails with [`Error::InvalidInput`] when no `name` column is present or
    /// its value is blank.
    pub fn from_fields<I>(fields: I) -> crate::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let fields: BTreeMap<String, String> = fields.into_iter().collect();
        let name = fields
            .iter()
            .find(|(key, _)| Self::is_name_key(key))
            .map(|(_, value)| value.trim().to_string())
            .unwrap_or_default();

        if name.is_empty() {
            return Err(Error::InvalidInput("Name is Empty".to_string()));
        }

        Ok(Self { name, fields })
    }

    /// Convenience constructor for a record with only a name column
    pub fn named(name: impl Into<String>) -> crate::Result<Self> {
        Self::from_fields([("Name".to_string(), name.into())])
    }

    /// Look up a column by exact header
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Columns other than the name column
    pub fn extra_fields(&self) -> impl Iterator<Item = (&String, &String)> {
        self.fields.iter().filter(|(key, _)| !Self::is_name_key(key))
    }

    fn is_name_key(key: &str) -> bool {
        key.trim().eq_ignore_ascii_case("name")
    }
}

impl TryFrom<BTreeMap<String, String>> for Record {
    type Error = Error;

    fn try_from(fields: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        Self::from_fields(fields)
    }
}

impl From<Record> for BTreeMap<String, String> {
    fn from(record: Record) -> Self {
        record.fields
    }
}

/// Successful pipeline run for one record
#[derive(Clone, Debug)]
pub struct RecordSuccess {
    /// Zero-based index of the record in the submitted list
    pub index: usize,
    /// The record
    pub record: Record,
    /// Identifier assigned by the certificate registry
    pub registry_id: String,
    /// Downloaded artifact on local disk
    pub artifact: PathBuf,
}

/// Terminal result of one record's pipeline run
#[derive(Clone, Debug)]
pub enum Outcome {
    /// All four stages completed
    Success(RecordSuccess),
    /// The pipeline stopped at a stage
    Failure(StageError),
}

impl Outcome {
    /// Original index of the record
    pub fn index(&self) -> usize {
        match self {
            Outcome::Success(s) => s.index,
            Outcome::Failure(f) => f.index,
        }
    }

    /// The record this outcome belongs to
    pub fn record(&self) -> &Record {
        match self {
            Outcome::Success(s) => &s.record,
            Outcome::Failure(f) => &f.record,
        }
    }

    /// Whether the pipeline completed
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Stage at which the pipeline failed, if it did
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(f) => Some(f.stage),
        }
    }
}

/// Status column value in summaries and ledger result lists
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Artifact downloaded
    Success,
    /// Pipeline stopped at a stage
    Failed,
}

impl RecordStatus {
    /// Value written to the summary file
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Success => "success",
            RecordStatus::Failed => "failed",
        }
    }
}

/// Serializable per-record entry written to the ledger's result lists
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordResult {
    /// Zero-based index of the record in the submitted list
    pub index: usize,
    /// The uploaded row
    pub record: Record,
    /// Whether the pipeline completed
    pub status: RecordStatus,
    /// Failing stage (failures only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    /// Artifact file name inside the job directory (successes only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
}

impl From<&Outcome> for RecordResult {
    fn from(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Success(s) => RecordResult {
                index: s.index,
                record: s.record.clone(),
                status: RecordStatus::Success,
                stage: None,
                artifact: artifact_file_name(&s.artifact),
            },
            Outcome::Failure(f) => RecordResult {
                index: f.index,
                record: f.record.clone(),
                status: RecordStatus::Failed,
                stage: Some(f.stage),
                artifact: None,
            },
        }
    }
}

fn artifact_file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// Outcomes of a completed batch, split by result
///
/// Order within each list is completion order, not input order; every entry
/// keeps its original index.
#[derive(Clone, Debug, Default)]
pub struct BatchOutcomes {
    /// Records whose pipeline completed
    pub successes: Vec<RecordSuccess>,
    /// Records whose pipeline stopped at a stage
    pub failures: Vec<StageError>,
}

impl BatchOutcomes {
    /// Add one settled outcome
    pub fn push(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Success(s) => self.successes.push(s),
            Outcome::Failure(f) => self.failures.push(f),
        }
    }

    /// Number of settled records
    pub fn total(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    /// Success entries sorted by original index
    pub fn success_results(&self) -> Vec<RecordResult> {
        let mut results: Vec<RecordResult> = self
            .successes
            .iter()
            .map(|s| RecordResult::from(&Outcome::Success(s.clone())))
            .collect();
        results.sort_by_key(|r| r.index);
        results
    }

    /// Failure entries sorted by original index
    pub fn failure_results(&self) -> Vec<RecordResult> {
        let mut results: Vec<RecordResult> = self
            .failures
            .iter()
            .map(|f| RecordResult::from(&Outcome::Failure(f.clone())))
            .collect();
        results.sort_by_key(|r| r.index);
        results
    }

    /// All entries sorted by original index
    pub fn results(&self) -> Vec<RecordResult> {
        let mut results = self.success_results();
        results.extend(self.failure_results());
        results.sort_by_key(|r| r.index);
        results
    }
}

/// Result of a fully processed job
#[derive(Clone, Debug)]
pub struct JobReport {
    /// Job identifier
    pub id: JobId,
    /// Per-record outcomes
    pub outcomes: BatchOutcomes,
    /// Location of the job archive
    pub archive: PathBuf,
}

impl JobReport {
    /// Number of records whose pipeline completed
    pub fn succeeded(&self) -> usize {
        self.outcomes.successes.len()
    }

    /// Number of records whose pipeline failed
    pub fn failed(&self) -> usize {
        self.outcomes.failures.len()
    }
}

/// Event emitted during a job's lifecycle
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job marked Running and records about to be dispatched
    JobStarted {
        /// Job ID
        id: JobId,
        /// Number of records in the job
        total_records: usize,
    },

    /// A record's artifact was downloaded
    RecordSucceeded {
        /// Job ID
        id: JobId,
        /// Original record index
        index: usize,
        /// Artifact path
        artifact: PathBuf,
    },

    /// A record's pipeline stopped at a stage
    RecordFailed {
        /// Job ID
        id: JobId,
        /// Original record index
        index: usize,
        /// Failing stage
        stage: Stage,
        /// Failure description
        error: String,
    },

    /// Job directory archived
    JobArchived {
        /// Job ID
        id: JobId,
        /// Archive path
        archive: PathBuf,
    },

    /// Job recorded as Completed in the ledger
    JobCompleted {
        /// Job ID
        id: JobId,
        /// Records that succeeded
        succeeded: usize,
        /// Records that failed
        failed: usize,
        /// Archive path
        archive: PathBuf,
    },

    /// Job could not be finalized; its ledger status is unresolved
    JobFailed {
        /// Job ID
        id: JobId,
        /// Error message
        error: String,
    },
}
