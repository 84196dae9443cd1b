//! Closing steps of a job run.

use chrono::Utc;
use std::path::PathBuf;

use crate::error::Result;
use crate::ledger::JobUpdate;
use crate::types::{BatchOutcomes, Event};

use super::scheduler::JobContext;
use super::summary::write_summary;

/// Write the summary, archive the job directory and record completion.
///
/// Must only be called once every record has settled. The ledger is touched
/// only after the archive exists. Any failure is logged, announced as
/// [`Event::JobFailed`] and returned; the job then stays Running in the
/// ledger for an operator to resubmit.
pub async fn finalize(job: &JobContext, outcomes: &BatchOutcomes) -> Result<PathBuf> {
    match finalize_inner(job, outcomes).await {
        Ok(archive) => Ok(archive),
        Err(e) => {
            job.emit(Event::JobFailed {
                id: job.id,
                error: e.to_string(),
            });
            Err(e)
        }
    }
}

async fn finalize_inner(job: &JobContext, outcomes: &BatchOutcomes) -> Result<PathBuf> {
    // Exists even when every record failed before fetch
    tokio::fs::create_dir_all(&job.job_dir).await?;

    let summary_path = job.job_dir.join(&job.summary_file_name);
    if let Err(e) = write_summary(&summary_path, outcomes).await {
        tracing::error!(job_id = %job.id, path = %summary_path.display(), error = %e, "failed to write job summary");
        return Err(e);
    }

    let archive = match job.archiver.archive(&job.job_dir).await {
        Ok(archive) => archive,
        Err(e) => {
            tracing::error!(job_id = %job.id, error = %e, "failed to archive job directory; job left unresolved");
            return Err(e);
        }
    };
    job.emit(Event::JobArchived {
        id: job.id,
        archive: archive.clone(),
    });

    let update = JobUpdate::completed(outcomes, &archive, Utc::now())?;
    if let Err(e) = job.ledger.update(job.id, &update).await {
        tracing::error!(
            job_id = %job.id,
            archive = %archive.display(),
            error = %e,
            "failed to record job completion; job remains running"
        );
        return Err(e);
    }

    let succeeded = outcomes.successes.len();
    let failed = outcomes.failures.len();
    tracing::info!(job_id = %job.id, succeeded, failed, archive = %archive.display(), "job completed");
    job.emit(Event::JobCompleted {
        id: job.id,
        succeeded,
        failed,
        archive: archive.clone(),
    });

    Ok(archive)
}
