//! Stage sequencing for a single record.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::CertificateTemplate;
use crate::error::{StageCause, StageError};
use crate::remote::{BlobFetcher, CertificateService, GenerateRequest};
use crate::types::{JobId, Outcome, Record, RecordSuccess, Stage};
use crate::utils::sanitize_file_name;

use super::context::{Generated, Pending, PipelineContext, Registered, Signed};
use super::fetch::download_to_file;

/// Everything a record pipeline needs, shared by all records of one job
#[derive(Clone)]
pub struct PipelineDeps {
    /// Job the records belong to
    pub job_id: JobId,
    /// Generate, register and sign calls
    pub service: Arc<dyn CertificateService>,
    /// Artifact downloads
    pub fetcher: Arc<dyn BlobFetcher>,
    /// Template copied into every generate request
    pub template: Arc<CertificateTemplate>,
    /// Signed URL lifetime (`None` = service default)
    pub sign_expiry: Option<Duration>,
    /// Directory receiving the job's artifacts
    pub job_dir: PathBuf,
    /// Extension of artifact files, without the dot
    pub artifact_extension: String,
}

/// Local path of a record's artifact: `<job_dir>/<name>_<registry id>.<ext>`
pub fn artifact_path(job_dir: &Path, record: &Record, registry_id: &str, extension: &str) -> PathBuf {
    job_dir.join(format!(
        "{}_{}.{}",
        sanitize_file_name(&record.name),
        sanitize_file_name(registry_id),
        extension
    ))
}

/// Run generate, register, sign and fetch for one record.
///
/// Never returns early with an error: every failure becomes an
/// [`Outcome::Failure`] naming the stage that stopped the pipeline, and no
/// later stage is attempted.
pub async fn run_pipeline(deps: &PipelineDeps, index: usize, record: Record) -> Outcome {
    match drive(deps, PipelineContext::new(index, record)).await {
        Ok(success) => {
            tracing::debug!(
                job_id = %deps.job_id,
                index,
                artifact = %success.artifact.display(),
                "record completed"
            );
            Outcome::Success(success)
        }
        Err(failure) => {
            tracing::warn!(
                job_id = %deps.job_id,
                index,
                stage = %failure.stage,
                name = %failure.record.name,
                error = %failure.cause,
                "record failed"
            );
            Outcome::Failure(failure)
        }
    }
}

async fn drive(
    deps: &PipelineDeps,
    ctx: PipelineContext<Pending>,
) -> Result<RecordSuccess, StageError> {
    let ctx = generate(deps, ctx).await?;
    let ctx = register(deps, ctx).await?;
    let ctx = sign(deps, ctx).await?;
    fetch(deps, ctx).await
}

async fn generate(
    deps: &PipelineDeps,
    ctx: PipelineContext<Pending>,
) -> Result<PipelineContext<Generated>, StageError> {
    let request = GenerateRequest::for_record(&ctx.record, &deps.template);
    let responses = match deps.service.generate(&request).await {
        Ok(responses) => responses,
        Err(cause) => return Err(ctx.fail(Stage::Generate, cause)),
    };

    let Some(certificate) = responses.into_iter().next() else {
        return Err(ctx.fail(
            Stage::Generate,
            StageCause::MalformedResponse("empty response list".to_string()),
        ));
    };

    let Some(document_url) = certificate.pdf_url.clone().filter(|url| !url.is_empty()) else {
        return Err(ctx.fail(
            Stage::Generate,
            StageCause::MalformedResponse(format!(
                "certificate {} has no document URL",
                certificate.id
            )),
        ));
    };

    Ok(ctx.advance(Generated {
        certificate,
        document_url,
    }))
}

async fn register(
    deps: &PipelineDeps,
    ctx: PipelineContext<Generated>,
) -> Result<PipelineContext<Registered>, StageError> {
    match deps.service.register(&ctx.state.certificate).await {
        Ok(registry_id) => {
            let document_url = ctx.state.document_url.clone();
            Ok(ctx.advance(Registered {
                registry_id,
                document_url,
            }))
        }
        Err(cause) => Err(ctx.fail(Stage::Register, cause)),
    }
}

async fn sign(
    deps: &PipelineDeps,
    ctx: PipelineContext<Registered>,
) -> Result<PipelineContext<Signed>, StageError> {
    let signed = deps
        .service
        .sign(
            &ctx.state.registry_id,
            &ctx.state.document_url,
            deps.sign_expiry,
        )
        .await;

    match signed {
        Ok(signed_url) => {
            let registry_id = ctx.state.registry_id.clone();
            Ok(ctx.advance(Signed {
                registry_id,
                signed_url,
            }))
        }
        Err(cause) => Err(ctx.fail(Stage::Sign, cause)),
    }
}

async fn fetch(
    deps: &PipelineDeps,
    ctx: PipelineContext<Signed>,
) -> Result<RecordSuccess, StageError> {
    let destination = artifact_path(
        &deps.job_dir,
        &ctx.record,
        &ctx.state.registry_id,
        &deps.artifact_extension,
    );

    match download_to_file(deps.fetcher.as_ref(), &ctx.state.signed_url, &destination).await {
        Ok(()) => Ok(ctx.complete(destination)),
        Err(cause) => Err(ctx.fail(Stage::Fetch, cause)),
    }
}
