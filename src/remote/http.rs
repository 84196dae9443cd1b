//! HTTP implementations of the remote collaborators.

use async_trait::async_trait;
use futures::StreamExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use crate::config::{DEFAULT_SIGNED_URL_EXPIRY_SECS, ServiceConfig};
use crate::error::{Error, Result, StageCause};

use super::wire::{
    GenerateRequest, GenerateResult, GeneratedCertificate, RESPONSE_OK, RegisterResult,
    RequestEnvelope, ResponseEnvelope, SignRequest, SignResult,
};
use super::{BlobFetcher, ByteStream, CertificateService, StageResult};

/// Certificate services reached over HTTP with bearer-token auth
pub struct HttpCertificateService {
    client: reqwest::Client,
    auth_token: Option<String>,
    generate_url: Url,
    register_url: Url,
    sign_url: Url,
}

impl HttpCertificateService {
    /// Build a client for the configured endpoints
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let base = base_url(&config.base_url)?;
        Ok(Self {
            client,
            auth_token: config.auth_token.clone(),
            generate_url: join_endpoint(&base, &config.generate_path, "service.generate_path")?,
            register_url: join_endpoint(&base, &config.register_path, "service.register_path")?,
            sign_url: join_endpoint(&base, &config.sign_path, "service.sign_path")?,
        })
    }

    /// POST an enveloped request and unwrap the `result` of an OK response.
    async fn post<B, T>(&self, url: &Url, body: &B) -> StageResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let mut request = self
            .client
            .post(url.clone())
            .json(&RequestEnvelope::new(body));
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StageCause::from_transport(&e))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| StageCause::from_transport(&e))?;

        let envelope: ResponseEnvelope<T> = match serde_json::from_slice(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(StageCause::Rejected {
                    response_code: status.as_u16().to_string(),
                });
            }
            Err(e) => {
                return Err(StageCause::MalformedResponse(format!(
                    "invalid response body from {}: {}",
                    url.path(),
                    e
                )));
            }
        };

        if envelope.response_code != RESPONSE_OK || !status.is_success() {
            // An envelope claiming OK on an HTTP error says nothing useful
            let response_code = if envelope.response_code.is_empty()
                || envelope.response_code == RESPONSE_OK
            {
                status.as_u16().to_string()
            } else {
                envelope.response_code
            };
            return Err(StageCause::Rejected { response_code });
        }

        envelope.result.ok_or_else(|| {
            StageCause::MalformedResponse(format!("response from {} has no result", url.path()))
        })
    }
}

#[async_trait]
impl CertificateService for HttpCertificateService {
    async fn generate(&self, request: &GenerateRequest) -> StageResult<Vec<GeneratedCertificate>> {
        let result: GenerateResult = self.post(&self.generate_url, request).await?;
        Ok(result.response)
    }

    async fn register(&self, certificate: &GeneratedCertificate) -> StageResult<String> {
        let result: RegisterResult = self.post(&self.register_url, certificate).await?;
        result
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| StageCause::MalformedResponse("registry assigned no id".to_string()))
    }

    async fn sign(
        &self,
        registry_id: &str,
        document_url: &str,
        expiry: Option<Duration>,
    ) -> StageResult<String> {
        let expiry = expiry
            .map(|d| d.as_secs())
            .unwrap_or(DEFAULT_SIGNED_URL_EXPIRY_SECS);
        tracing::debug!(registry_id, expiry, "requesting signed download URL");

        let body = SignRequest {
            pdf_url: document_url,
            expiry,
        };
        let result: SignResult = self.post(&self.sign_url, &body).await?;
        result
            .signed_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| StageCause::MalformedResponse("no signed URL in response".to_string()))
    }
}

/// Plain HTTP GET of signed artifact URLs
pub struct HttpBlobFetcher {
    client: reqwest::Client,
}

impl HttpBlobFetcher {
    /// Build a fetcher whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl BlobFetcher for HttpBlobFetcher {
    async fn stream_download(&self, url: &str) -> StageResult<ByteStream> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StageCause::from_transport(&e))?;

        if !response.status().is_success() {
            return Err(StageCause::Rejected {
                response_code: response.status().as_u16().to_string(),
            });
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other))
            .boxed())
    }
}

/// Parse the base URL, making sure relative endpoints are appended to its path.
fn base_url(raw: &str) -> Result<Url> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized).map_err(|e| Error::Config {
        message: format!("invalid base_url '{}': {}", raw, e),
        key: Some("service.base_url".to_string()),
    })
}

fn join_endpoint(base: &Url, path: &str, key: &str) -> Result<Url> {
    base.join(path.trim_start_matches('/'))
        .map_err(|e| Error::Config {
            message: format!("invalid endpoint '{}': {}", path, e),
            key: Some(key.to_string()),
        })
}
