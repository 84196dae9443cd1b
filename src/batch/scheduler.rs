//! Bounded-concurrency dispatch of record pipelines.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::archive::Archiver;
use crate::error::Result;
use crate::ledger::{JobLedger, JobUpdate};
use crate::pipeline::{PipelineDeps, run_pipeline};
use crate::types::{BatchOutcomes, Event, JobId, Outcome, Record};

/// Job-level collaborators and settings shared by the scheduler and the aggregator
#[derive(Clone)]
pub struct JobContext {
    /// Job being processed
    pub id: JobId,
    /// Durable job store
    pub ledger: Arc<dyn JobLedger>,
    /// Bundles the job directory once every record has settled
    pub archiver: Arc<dyn Archiver>,
    /// Lifecycle event channel
    pub event_tx: broadcast::Sender<Event>,
    /// Directory holding the job's artifacts and summary
    pub job_dir: PathBuf,
    /// Summary file name inside `job_dir`
    pub summary_file_name: String,
    /// Maximum record pipelines in flight
    pub concurrency: usize,
}

impl JobContext {
    pub(crate) fn emit(&self, event: Event) {
        // No subscribers is fine
        self.event_tx.send(event).ok();
    }
}

/// Drop output left in the job directory by an earlier run of the same job.
async fn clear_job_dir(job: &JobContext) -> Result<()> {
    match tokio::fs::remove_dir_all(&job.job_dir).await {
        Ok(()) => {
            tracing::warn!(job_id = %job.id, path = %job.job_dir.display(), "discarded output of previous run");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Run the pipeline for every record and wait for all of them to settle.
///
/// The job is marked Running in the ledger before anything is dispatched; if
/// that write fails no record is processed and the error is returned. Any
/// output already in the job directory is then discarded, so the archive
/// only ever holds this run's artifacts. After that, individual record failures are collected as outcomes and never stop
/// the batch. At most `job.concurrency` pipelines run at once.
pub async fn run_batch(
    job: &JobContext,
    pipeline: &PipelineDeps,
    records: Vec<Record>,
) -> Result<BatchOutcomes> {
    let total = records.len();

    if let Err(e) = job.ledger.update(job.id, &JobUpdate::started(Utc::now())).await {
        tracing::error!(job_id = %job.id, error = %e, "failed to mark job running; nothing dispatched");
        return Err(e);
    }

    if let Err(e) = clear_job_dir(job).await {
        tracing::error!(job_id = %job.id, path = %job.job_dir.display(), error = %e, "failed to clear job directory; nothing dispatched");
        return Err(e);
    }

    let concurrency = job.concurrency.max(1);
    tracing::info!(job_id = %job.id, total, concurrency, "job started");
    job.emit(Event::JobStarted {
        id: job.id,
        total_records: total,
    });

    let mut settled = stream::iter(records.into_iter().enumerate())
        .map(|(index, record)| run_pipeline(pipeline, index, record))
        .buffer_unordered(concurrency);

    let mut outcomes = BatchOutcomes::default();
    while let Some(outcome) = settled.next().await {
        match &outcome {
            Outcome::Success(s) => job.emit(Event::RecordSucceeded {
                id: job.id,
                index: s.index,
                artifact: s.artifact.clone(),
            }),
            Outcome::Failure(f) => job.emit(Event::RecordFailed {
                id: job.id,
                index: f.index,
                stage: f.stage,
                error: f.cause.to_string(),
            }),
        }
        outcomes.push(outcome);
    }

    tracing::info!(
        job_id = %job.id,
        total,
        succeeded = outcomes.successes.len(),
        failed = outcomes.failures.len(),
        "all records settled"
    );

    Ok(outcomes)
}
