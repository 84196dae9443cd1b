//! # bulk-certs
//!
//! Bulk certificate issuance pipeline.
//!
//! For every row of an uploaded batch, bulk-certs generates a certificate,
//! adds it to the certificate registry, obtains a signed download link and
//! downloads the rendered artifact into a per-job directory. Once every row
//! has settled, the job directory (artifacts plus a `result.csv` summary) is
//! archived and the job ledger records the outcome.
//!
//! ## Design
//!
//! - **Partial failure** - a row that fails at any stage is recorded and the
//!   batch carries on
//! - **Bounded concurrency** - at most `batch.max_concurrent_records` rows in flight
//! - **Durable ledger** - job lifecycle and results live in SQLite
//! - **Event-driven** - consumers subscribe to lifecycle events
//!
//! ## Quick Start
//!
//! ```no_run
//! use bulk_certs::{BulkIssuer, Config, NewJob, Record};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.apply_env_overrides();
//!
//!     let issuer = BulkIssuer::new(config).await?;
//!
//!     let mut events = issuer.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let records = vec![Record::named("Asha Rao")?, Record::named("Lee Chen")?];
//!     let report = issuer
//!         .submit_and_process(NewJob::certificates("course-completion", records))
//!         .await?;
//!     println!("{} issued, archive at {}", report.succeeded(), report.archive.display());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Job directory archiving
pub mod archive;
/// Batch scheduling and result aggregation
pub mod batch;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Bulk issuance facade
pub mod issuer;
/// Job ledger interface
pub mod ledger;
/// Per-record issuance pipeline
pub mod pipeline;
/// Remote certificate services and artifact downloads
pub mod remote;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use archive::{Archiver, ZipArchiver};
pub use config::{CertificateTemplate, Config};
pub use db::Database;
pub use error::{ArchiveError, DatabaseError, Error, Result, StageCause, StageError};
pub use issuer::{BulkIssuer, Collaborators};
pub use ledger::{JobLedger, JobUpdate, NewJob};
pub use remote::{BlobFetcher, CertificateService};
pub use types::{
    BatchOutcomes, Event, JobId, JobReport, JobStatus, Outcome, Record, RecordResult,
    RecordStatus, RecordSuccess, Stage,
};
