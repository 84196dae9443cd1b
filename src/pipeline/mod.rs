//! Per-record issuance pipeline.
//!
//! Split into focused submodules:
//! - [`context`] - Typed per-record state threaded between stages
//! - [`record`] - Stage sequencing and fail-fast short-circuiting
//! - [`fetch`] - Streaming artifact download to the job directory

mod context;
mod fetch;
mod record;


pub use record::{PipelineDeps, artifact_path, run_pipeline};
