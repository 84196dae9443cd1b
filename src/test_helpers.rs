//! In-process fakes for the pipeline's collaborators.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::StreamExt;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::archive::Archiver;
use crate::db::Job;
use crate::error::{ArchiveError, DatabaseError, Error, Result, StageCause};
use crate::ledger::{JobLedger, JobUpdate, NewJob};
use crate::remote::{
    BlobFetcher, ByteStream, CertificateService, GenerateRequest, GeneratedCertificate,
    StageResult,
};
use crate::types::{JobId, JobStatus, Record, Stage};

/// Build a record with only a name column
pub(crate) fn record(name: &str) -> Record {
    Record::named(name).unwrap()
}

/// Tracks how many remote calls are in flight and the peak seen
#[derive(Default)]
pub(crate) struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Certificate service that derives every id from the recipient name.
///
/// generate -> `gen-<name>`, register -> `reg-<name>`, sign -> `https://blobs.test/<name>.pdf`.
/// Individual names can be made to fail at any stage.
pub(crate) struct FakeService {
    failures: HashMap<String, (Stage, StageCause)>,
    generated: HashMap<String, Vec<GeneratedCertificate>>,
    delay: Duration,
    pub(crate) gauge: Arc<Gauge>,
    pub(crate) generate_calls: AtomicUsize,
    pub(crate) register_calls: AtomicUsize,
    pub(crate) sign_calls: AtomicUsize,
    pub(crate) sign_expiries: Mutex<Vec<Option<Duration>>>,
}

impl FakeService {
    pub(crate) fn new() -> Self {
        Self {
            failures: HashMap::new(),
            generated: HashMap::new(),
            delay: Duration::ZERO,
            gauge: Arc::new(Gauge::default()),
            generate_calls: AtomicUsize::new(0),
            register_calls: AtomicUsize::new(0),
            sign_calls: AtomicUsize::new(0),
            sign_expiries: Mutex::new(Vec::new()),
        }
    }

    /// Make `name` fail at `stage` with `cause`
    pub(crate) fn failing(mut self, name: &str, stage: Stage, cause: StageCause) -> Self {
        self.failures.insert(name.to_string(), (stage, cause));
        self
    }

    /// Answer generate for `name` with `certificates` instead of the derived one
    pub(crate) fn generating(mut self, name: &str, certificates: Vec<GeneratedCertificate>) -> Self {
        self.generated.insert(name.to_string(), certificates);
        self
    }

    /// Sleep this long inside every call
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Share an in-flight gauge with another fake
    pub(crate) fn with_gauge(mut self, gauge: Arc<Gauge>) -> Self {
        self.gauge = gauge;
        self
    }

    pub(crate) fn calls(&self, stage: Stage) -> usize {
        match stage {
            Stage::Generate => self.generate_calls.load(Ordering::SeqCst),
            Stage::Register => self.register_calls.load(Ordering::SeqCst),
            Stage::Sign => self.sign_calls.load(Ordering::SeqCst),
            Stage::Fetch => 0,
        }
    }

    async fn call(&self, stage: Stage, name: &str) -> StageResult<()> {
        self.gauge.enter();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.gauge.exit();

        match self.failures.get(name) {
            Some((failing_stage, cause)) if *failing_stage == stage => Err(cause.clone()),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl CertificateService for FakeService {
    async fn generate(&self, request: &GenerateRequest) -> StageResult<Vec<GeneratedCertificate>> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        let name = request
            .certificate
            .data
            .first()
            .map(|d| d.recipient_name.clone())
            .unwrap_or_default();
        self.call(Stage::Generate, &name).await?;

        if let Some(certificates) = self.generated.get(&name) {
            return Ok(certificates.clone());
        }

        Ok(vec![GeneratedCertificate {
            id: format!("gen-{name}"),
            pdf_url: Some(format!("https://docs.test/{name}.pdf")),
            json_url: None,
            access_code: None,
            json_data: serde_json::json!({ "name": name }),
        }])
    }

    async fn register(&self, certificate: &GeneratedCertificate) -> StageResult<String> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        let name = certificate.id.trim_start_matches("gen-");
        self.call(Stage::Register, name).await?;
        Ok(format!("reg-{name}"))
    }

    async fn sign(
        &self,
        registry_id: &str,
        _document_url: &str,
        expiry: Option<Duration>,
    ) -> StageResult<String> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        self.sign_expiries.lock().unwrap().push(expiry);
        let name = registry_id.trim_start_matches("reg-");
        self.call(Stage::Sign, name).await?;
        Ok(format!("https://blobs.test/{name}.pdf"))
    }
}

/// Blob fetcher that serves `artifact:<url>` for every URL
pub(crate) struct FakeFetcher {
    failing_urls: HashMap<String, StageCause>,
    broken_streams: Vec<String>,
    delay: Duration,
    gauge: Arc<Gauge>,
    pub(crate) calls: AtomicUsize,
}

impl FakeFetcher {
    pub(crate) fn new() -> Self {
        Self {
            failing_urls: HashMap::new(),
            broken_streams: Vec::new(),
            delay: Duration::ZERO,
            gauge: Arc::new(Gauge::default()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Refuse to open `url`
    pub(crate) fn failing(mut self, url: &str, cause: StageCause) -> Self {
        self.failing_urls.insert(url.to_string(), cause);
        self
    }

    /// Open `url` but fail after the first chunk
    pub(crate) fn breaking_mid_stream(mut self, url: &str) -> Self {
        self.broken_streams.push(url.to_string());
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn with_gauge(mut self, gauge: Arc<Gauge>) -> Self {
        self.gauge = gauge;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Body served for `url`
    pub(crate) fn body_for(url: &str) -> String {
        format!("artifact:{url}")
    }
}

#[async_trait]
impl BlobFetcher for FakeFetcher {
    async fn stream_download(&self, url: &str) -> StageResult<ByteStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gauge.enter();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.gauge.exit();

        if let Some(cause) = self.failing_urls.get(url) {
            return Err(cause.clone());
        }

        let body = Self::body_for(url).into_bytes();
        let (head, tail) = body.split_at(body.len() / 2);
        let mut chunks = vec![Ok(Bytes::copy_from_slice(head))];
        if self.broken_streams.iter().any(|u| u == url) {
            chunks.push(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )));
        } else {
            chunks.push(Ok(Bytes::copy_from_slice(tail)));
        }

        Ok(futures::stream::iter(chunks).boxed())
    }
}

/// Ledger kept in memory; can simulate a store outage per transition
#[derive(Default)]
pub(crate) struct MemoryLedger {
    jobs: Mutex<Vec<Job>>,
    pub(crate) updates: Mutex<Vec<(JobId, JobUpdate)>>,
    pub(crate) fail_on_start: AtomicBool,
    pub(crate) fail_on_complete: AtomicBool,
}

impl MemoryLedger {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn status(&self, id: JobId) -> Option<JobStatus> {
        let jobs = self.jobs.lock().unwrap();
        jobs.iter()
            .find(|j| j.id == id.get())
            .and_then(|j| j.job_status())
    }

    pub(crate) fn job(&self, id: JobId) -> Option<Job> {
        let jobs = self.jobs.lock().unwrap();
        jobs.iter().find(|j| j.id == id.get()).cloned()
    }

    pub(crate) fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }
}

fn outage() -> Error {
    Error::Database(DatabaseError::QueryFailed(
        "simulated store outage".to_string(),
    ))
}

#[async_trait]
impl JobLedger for MemoryLedger {
    async fn create(&self, job: &NewJob) -> Result<JobId> {
        let mut jobs = self.jobs.lock().unwrap();
        let id = jobs.len() as i64 + 1;
        let now = Utc::now().timestamp();
        jobs.push(Job {
            id,
            object_type: job.object_type.clone(),
            cert_type: job.cert_type.clone(),
            organisation_id: job.organisation_id.clone(),
            uploaded_by: job.uploaded_by.clone(),
            data: serde_json::to_string(&job.records)?,
            status: JobStatus::Created.to_i32(),
            retry_count: 0,
            success_result: None,
            failure_result: None,
            storage_details: None,
            created_at: now,
            process_start_time: None,
            process_end_time: None,
            last_updated_on: now,
        });
        Ok(JobId(id))
    }

    async fn update(&self, id: JobId, changes: &JobUpdate) -> Result<()> {
        match changes.status {
            Some(JobStatus::Running) if self.fail_on_start.load(Ordering::SeqCst) => {
                return Err(outage());
            }
            Some(JobStatus::Completed) if self.fail_on_complete.load(Ordering::SeqCst) => {
                return Err(outage());
            }
            _ => {}
        }

        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .iter_mut()
            .find(|j| j.id == id.get())
            .ok_or_else(|| Error::Database(DatabaseError::NotFound(format!("job {id}"))))?;

        if let Some(status) = changes.status {
            job.status = status.to_i32();
        }
        if let Some(retry) = changes.retry_count {
            job.retry_count = retry;
        }
        if let Some(at) = changes.process_start_time {
            job.process_start_time = Some(at.timestamp());
        }
        if let Some(at) = changes.process_end_time {
            job.process_end_time = Some(at.timestamp());
        }
        if changes.success_result.is_some() {
            job.success_result = changes.success_result.clone();
        }
        if changes.failure_result.is_some() {
            job.failure_result = changes.failure_result.clone();
        }
        if changes.storage_details.is_some() {
            job.storage_details = changes.storage_details.clone();
        }
        job.last_updated_on = Utc::now().timestamp();
        drop(jobs);

        self.updates.lock().unwrap().push((id, changes.clone()));
        Ok(())
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>> {
        Ok(self.job(id))
    }
}

/// Archiver that always fails without touching the filesystem
pub(crate) struct FailingArchiver;

#[async_trait]
impl Archiver for FailingArchiver {
    async fn archive(&self, source_dir: &Path) -> Result<PathBuf> {
        Err(ArchiveError::Write {
            path: source_dir.with_extension("zip"),
            reason: "simulated disk failure".to_string(),
        }
        .into())
    }
}
