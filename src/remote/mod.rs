//! Remote collaborators of the issuance pipeline.
//!
//! - [`CertificateService`] - generate, register and sign calls against the certificate services
//! - [`BlobFetcher`] - streaming download of a rendered artifact
//!
//! [`HttpCertificateService`] and [`HttpBlobFetcher`] are the production
//! implementations; tests substitute in-process fakes.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::time::Duration;

use crate::error::StageCause;

mod http;
mod wire;


pub use http::{HttpBlobFetcher, HttpCertificateService};
pub use wire::{
    CertificateRequest, GenerateRequest, GeneratedCertificate, RESPONSE_OK, RecipientData,
};

/// Result of a single remote call; the error is classified but not yet tied to a stage.
pub type StageResult<T> = std::result::Result<T, StageCause>;

/// Artifact body as a stream of chunks, ending at end-of-stream or the first error.
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Certificate generation, registry and signing services
#[async_trait]
pub trait CertificateService: Send + Sync {
    /// Render certificates for a request; a successful call yields at least zero responses.
    async fn generate(&self, request: &GenerateRequest) -> StageResult<Vec<GeneratedCertificate>>;

    /// Add a generated certificate to the registry and return its registry id.
    async fn register(&self, certificate: &GeneratedCertificate) -> StageResult<String>;

    /// Obtain a signed, time-limited URL for a registered document.
    ///
    /// `expiry` of `None` means the default lifetime of
    /// [`DEFAULT_SIGNED_URL_EXPIRY_SECS`](crate::config::DEFAULT_SIGNED_URL_EXPIRY_SECS).
    async fn sign(
        &self,
        registry_id: &str,
        document_url: &str,
        expiry: Option<Duration>,
    ) -> StageResult<String>;
}

/// Streaming download of artifact content
#[async_trait]
pub trait BlobFetcher: Send + Sync {
    /// Open a byte stream for `url`.
    async fn stream_download(&self, url: &str) -> StageResult<ByteStream>;
}
