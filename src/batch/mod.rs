//! Batch scheduling and result aggregation for one job.
//!
//! - [`scheduler`] - Runs every record's pipeline with bounded concurrency
//! - [`finalize`] - Summary file, archive and the closing ledger update
//! - [`summary`] - Tabular per-record summary written into the job directory

mod finalize;
mod scheduler;
mod summary;


pub use finalize::finalize;
pub use scheduler::{JobContext, run_batch};
pub use summary::{SUMMARY_HEADER, render_summary, write_summary};
