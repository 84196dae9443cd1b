//! Job ledger CRUD operations.

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::ledger::{JobLedger, JobUpdate, NewJob};
use crate::types::{JobId, JobStatus, Record};
use crate::{Error, Result};

use super::{Database, Job};

const JOB_COLUMNS: &str = r#"
    id, object_type, cert_type, organisation_id, uploaded_by, data,
    status, retry_count, success_result, failure_result, storage_details,
    created_at, process_start_time, process_end_time, last_updated_on
"#;

impl Database {
    /// Insert a new job with status Created
    pub async fn create_job(&self, job: &NewJob) -> Result<JobId> {
        let now = chrono::Utc::now().timestamp();
        let data = serde_json::to_string(&job.records)?;

        let result = sqlx::query(
            r#"
            INSERT INTO bulk_upload_jobs (
                object_type, cert_type, organisation_id, uploaded_by, data,
                status, retry_count, created_at, last_updated_on
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.object_type)
        .bind(&job.cert_type)
        .bind(&job.organisation_id)
        .bind(&job.uploaded_by)
        .bind(&data)
        .bind(JobStatus::Created.to_i32())
        .bind(0i32) // retry_count
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert job: {}",
                e
            )))
        })?;

        Ok(JobId(result.last_insert_rowid()))
    }

    /// Apply field changes to a job in a single statement
    ///
    /// Fields left as `None` keep their stored value. `last_updated_on` is
    /// always refreshed.
    pub async fn update_job(&self, id: JobId, changes: &JobUpdate) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            UPDATE bulk_upload_jobs SET
                status = COALESCE(?, status),
                retry_count = COALESCE(?, retry_count),
                process_start_time = COALESCE(?, process_start_time),
                process_end_time = COALESCE(?, process_end_time),
                success_result = COALESCE(?, success_result),
                failure_result = COALESCE(?, failure_result),
                storage_details = COALESCE(?, storage_details),
                last_updated_on = ?
            WHERE id = ?
            "#,
        )
        .bind(changes.status.map(|s| s.to_i32()))
        .bind(changes.retry_count)
        .bind(changes.process_start_time.map(|t| t.timestamp()))
        .bind(changes.process_end_time.map(|t| t.timestamp()))
        .bind(&changes.success_result)
        .bind(&changes.failure_result)
        .bind(&changes.storage_details)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to update job: {}",
                e
            )))
        })?;

        if result.rows_affected() == 0 {
            return Err(Error::Database(DatabaseError::NotFound(format!(
                "job {}",
                id
            ))));
        }

        Ok(())
    }

    /// Get a job by ID
    pub async fn get_job(&self, id: JobId) -> Result<Option<Job>> {
        let query = format!("SELECT {JOB_COLUMNS} FROM bulk_upload_jobs WHERE id = ?");
        let row = sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to get job: {}",
                    e
                )))
            })?;

        Ok(row)
    }

    /// List jobs with a specific status, oldest first
    ///
    /// Jobs left in [`JobStatus::Running`] after their run ended are the ones
    /// an operator needs to look at.
    pub async fn list_jobs_by_status(&self, status: JobStatus) -> Result<Vec<Job>> {
        let query = format!(
            "SELECT {JOB_COLUMNS} FROM bulk_upload_jobs WHERE status = ? ORDER BY created_at ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, Job>(&query)
            .bind(status.to_i32())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to list jobs: {}",
                    e
                )))
            })?;

        Ok(rows)
    }

    /// Stored upload rows of a job
    pub async fn job_records(&self, id: JobId) -> Result<Vec<Record>> {
        match self.get_job(id).await? {
            Some(job) => job.records(),
            None => Err(Error::NotFound(format!("job {}", id))),
        }
    }
}

#[async_trait]
impl JobLedger for Database {
    async fn create(&self, job: &NewJob) -> Result<JobId> {
        self.create_job(job).await
    }

    async fn update(&self, id: JobId, changes: &JobUpdate) -> Result<()> {
        self.update_job(id, changes).await
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>> {
        self.get_job(id).await
    }
}
