//! Job submission and processing.

use tracing::info;

use crate::batch::{finalize, run_batch};
use crate::error::{Error, Result};
use crate::ledger::NewJob;
use crate::types::{JobId, JobReport, JobStatus, Record};

use super::BulkIssuer;

impl BulkIssuer {
    /// Record a new job in the ledger with status Created.
    ///
    /// Rejects an upload with no rows, or with a row whose display name is
    /// blank, before anything is written.
    pub async fn submit(&self, job: NewJob) -> Result<JobId> {
        validate_records(&job.records)?;

        let id = self.ledger.create(&job).await?;
        info!(job_id = %id, records = job.records.len(), cert_type = %job.cert_type, "job submitted");
        Ok(id)
    }

    /// Run every record of job `id` through the pipeline, then write the
    /// summary, archive the job directory and mark the job Completed.
    ///
    /// Anything already in the job directory is discarded once the job is
    /// marked Running. Per-record failures are part of the returned report. An error means
    /// the run itself could not start or could not be finalized.
    pub async fn process(&self, id: JobId, records: Vec<Record>) -> Result<JobReport> {
        validate_records(&records)?;

        let job = self.job_context(id);
        let pipeline = self.pipeline_deps(id);

        let outcomes = run_batch(&job, &pipeline, records).await?;
        let archive = finalize(&job, &outcomes).await?;

        Ok(JobReport {
            id,
            outcomes,
            archive,
        })
    }

    /// Submit a job and process it immediately.
    pub async fn submit_and_process(&self, job: NewJob) -> Result<JobReport> {
        let records = job.records.clone();
        let id = self.submit(job).await?;
        self.process(id, records).await
    }

    /// Re-run a job that never reached Completed, using its stored records.
    pub async fn resubmit(&self, id: JobId) -> Result<JobReport> {
        let job = self
            .ledger
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("job {}", id)))?;

        if job.job_status() == Some(JobStatus::Completed) {
            return Err(Error::InvalidInput(format!(
                "job {} is already completed",
                id
            )));
        }

        let records = job.records()?;
        info!(job_id = %id, status = job.status, retry_count = job.retry_count, "resubmitting job");

        self.process(id, records).await
    }
}

fn validate_records(records: &[Record]) -> Result<()> {
    if records.is_empty() {
        return Err(Error::InvalidInput("no records to process".to_string()));
    }

    if let Some(row) = records.iter().position(|r| r.name.trim().is_empty()) {
        return Err(Error::InvalidInput(format!(
            "Row {} : Name is Empty",
            row + 1
        )));
    }

    Ok(())
}
