//! The bulk-issuance facade.
//!
//! [`BulkIssuer`] wires the ledger, the remote services, the fetcher and the
//! archiver together and exposes job-level operations:
//! - [`jobs`] - Submission, processing and operator resubmission

mod jobs;


use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::archive::{Archiver, ZipArchiver};
use crate::batch::JobContext;
use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::ledger::JobLedger;
use crate::pipeline::PipelineDeps;
use crate::remote::{BlobFetcher, CertificateService, HttpBlobFetcher, HttpCertificateService};
use crate::types::{Event, JobId};

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Collaborators a [`BulkIssuer`] drives
#[derive(Clone)]
pub struct Collaborators {
    /// Durable job store
    pub ledger: Arc<dyn JobLedger>,
    /// Generate, register and sign calls
    pub service: Arc<dyn CertificateService>,
    /// Artifact downloads
    pub fetcher: Arc<dyn BlobFetcher>,
    /// Job directory archiver
    pub archiver: Arc<dyn Archiver>,
}

/// Bulk certificate issuer (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct BulkIssuer {
    config: Arc<Config>,
    ledger: Arc<dyn JobLedger>,
    service: Arc<dyn CertificateService>,
    fetcher: Arc<dyn BlobFetcher>,
    archiver: Arc<dyn Archiver>,
    event_tx: broadcast::Sender<Event>,
}

impl BulkIssuer {
    /// Create an issuer backed by the SQLite ledger, the HTTP services and
    /// the zip archiver described by `config`.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let db = Database::new(&config.persistence.database_path).await?;
        let service = HttpCertificateService::new(&config.service)?;
        let fetcher = HttpBlobFetcher::new(config.service.request_timeout)?;

        Self::from_parts(
            config,
            Collaborators {
                ledger: Arc::new(db),
                service: Arc::new(service),
                fetcher: Arc::new(fetcher),
                archiver: Arc::new(ZipArchiver),
            },
        )
    }

    /// Create an issuer from explicit collaborators.
    pub fn from_parts(config: Config, parts: Collaborators) -> Result<Self> {
        config.validate()?;

        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            config: Arc::new(config),
            ledger: parts.ledger,
            service: parts.service,
            fetcher: parts.fetcher,
            archiver: parts.archiver,
            event_tx,
        })
    }

    /// Subscribe to job lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The job ledger
    pub fn ledger(&self) -> &Arc<dyn JobLedger> {
        &self.ledger
    }

    fn job_context(&self, id: JobId) -> JobContext {
        JobContext {
            id,
            ledger: Arc::clone(&self.ledger),
            archiver: Arc::clone(&self.archiver),
            event_tx: self.event_tx.clone(),
            job_dir: self.config.storage.job_dir(id),
            summary_file_name: self.config.storage.summary_file_name.clone(),
            concurrency: self.config.batch.max_concurrent_records,
        }
    }

    fn pipeline_deps(&self, id: JobId) -> PipelineDeps {
        PipelineDeps {
            job_id: id,
            service: Arc::clone(&self.service),
            fetcher: Arc::clone(&self.fetcher),
            template: Arc::new(self.config.template.clone()),
            sign_expiry: self
                .config
                .service
                .signed_url_expiry_secs
                .map(Duration::from_secs),
            job_dir: self.config.storage.job_dir(id),
            artifact_extension: self.config.batch.artifact_extension.clone(),
        }
    }
}
