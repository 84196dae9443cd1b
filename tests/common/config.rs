//! Test configuration helpers and ledger wrappers

use async_trait::async_trait;
use bulk_certs::db::Job;
use bulk_certs::{Config, Database, JobId, JobLedger, JobStatus, JobUpdate, NewJob, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::MockServer;

/// Configuration pointing at `server`, storing everything under `temp_dir`
pub fn test_config(temp_dir: &TempDir, server: &MockServer) -> Config {
    let mut config = Config::default();
    config.service.base_url = server.uri();
    config.service.auth_token = Some("test-token".to_string());
    config.service.request_timeout = Duration::from_secs(2);
    config.storage.output_dir = temp_dir.path().join("Downloads");
    config.persistence.database_path = temp_dir.path().join("bulk-certs.db");
    config
}

/// SQLite ledger that can simulate a store outage when a job completes
pub struct OutageLedger {
    pub db: Arc<Database>,
    pub fail_completion: AtomicBool,
}

impl OutageLedger {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            fail_completion: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl JobLedger for OutageLedger {
    async fn create(&self, job: &NewJob) -> Result<JobId> {
        self.db.create(job).await
    }

    async fn update(&self, id: JobId, changes: &JobUpdate) -> Result<()> {
        if changes.status == Some(JobStatus::Completed) && self.fail_completion.load(Ordering::SeqCst)
        {
            return Err(bulk_certs::Error::Database(
                bulk_certs::DatabaseError::ConnectionFailed("store unavailable".to_string()),
            ));
        }
        self.db.update(id, changes).await
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>> {
        self.db.get(id).await
    }
}
