//! Pipeline context: one value per record, moved from stage to stage.
//!
//! Each stage consumes the context produced by the previous one, so a stage
//! can only run once its inputs exist. Any stage can turn the context into a
//! [`StageError`] carrying the record and its original index.

use std::path::PathBuf;

use crate::error::{StageCause, StageError};
use crate::remote::GeneratedCertificate;
use crate::types::{Record, RecordSuccess, Stage};

/// Record read, nothing called yet
#[derive(Debug)]
pub(super) struct Pending;

/// Generation service rendered the certificate
#[derive(Debug)]
pub(super) struct Generated {
    pub(super) certificate: GeneratedCertificate,
    pub(super) document_url: String,
}

/// Registry accepted the certificate
#[derive(Debug)]
pub(super) struct Registered {
    pub(super) registry_id: String,
    pub(super) document_url: String,
}

/// Signed download URL issued
#[derive(Debug)]
pub(super) struct Signed {
    pub(super) registry_id: String,
    pub(super) signed_url: String,
}

#[derive(Debug)]
pub(super) struct PipelineContext<S> {
    pub(super) index: usize,
    pub(super) record: Record,
    pub(super) state: S,
}

impl PipelineContext<Pending> {
    pub(super) fn new(index: usize, record: Record) -> Self {
        Self {
            index,
            record,
            state: Pending,
        }
    }
}

impl<S> PipelineContext<S> {
    /// Move to the next stage's state, keeping the record and index.
    pub(super) fn advance<T>(self, state: T) -> PipelineContext<T> {
        PipelineContext {
            index: self.index,
            record: self.record,
            state,
        }
    }

    /// Stop the pipeline at `stage`.
    pub(super) fn fail(self, stage: Stage, cause: StageCause) -> StageError {
        StageError {
            stage,
            index: self.index,
            record: self.record,
            cause,
        }
    }
}

impl PipelineContext<Signed> {
    /// Final transition once the artifact is on disk
    pub(super) fn complete(self, artifact: PathBuf) -> RecordSuccess {
        RecordSuccess {
            index: self.index,
            record: self.record,
            registry_id: self.state.registry_id,
            artifact,
        }
    }
}
