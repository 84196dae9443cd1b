//! JSON request and response bodies exchanged with the certificate services.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::CertificateTemplate;
use crate::types::Record;

/// Response code the services use for success
pub const RESPONSE_OK: &str = "OK";

/// `{"params": {}, "request": ...}` wrapper around every request body
#[derive(Debug, Serialize)]
pub(crate) struct RequestEnvelope<'a, T: Serialize> {
    params: BTreeMap<String, String>,
    request: &'a T,
}

impl<'a, T: Serialize> RequestEnvelope<'a, T> {
    pub(crate) fn new(request: &'a T) -> Self {
        Self {
            params: BTreeMap::new(),
            request,
        }
    }
}

/// `{"responseCode": "...", "result": ...}` wrapper around every response body
#[derive(Debug, Deserialize)]
pub(crate) struct ResponseEnvelope<T> {
    #[serde(rename = "responseCode", default)]
    pub(crate) response_code: String,
    pub(crate) result: Option<T>,
}

/// One recipient entry in a generate request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientData {
    /// Name printed on the certificate
    pub recipient_name: String,
    /// Remaining upload columns, passed through unchanged
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

/// Certificate section of a generate request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRequest {
    /// Recipients to render (one per record)
    pub data: Vec<RecipientData>,
    /// Template fields shared by the whole job
    #[serde(flatten)]
    pub template: CertificateTemplate,
}

/// Body of a certificate generation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateRequest {
    /// Certificate to render
    pub certificate: CertificateRequest,
}

impl GenerateRequest {
    /// Request rendering a single record with the job's template
    pub fn for_record(record: &Record, template: &CertificateTemplate) -> Self {
        let extra = record
            .extra_fields()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Self {
            certificate: CertificateRequest {
                data: vec![RecipientData {
                    recipient_name: record.name.clone(),
                    extra,
                }],
                template: template.clone(),
            },
        }
    }
}

/// One rendered certificate returned by the generation service
///
/// Sent back unchanged as the registry-add request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCertificate {
    /// Certificate identifier assigned by the generator
    pub id: String,
    /// Rendered document URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    /// Machine-readable certificate URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_url: Option<String>,
    /// Access code printed on the certificate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_code: Option<String>,
    /// Machine-readable certificate content
    #[serde(default)]
    pub json_data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateResult {
    #[serde(default)]
    pub(crate) response: Vec<GeneratedCertificate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterResult {
    #[serde(default)]
    pub(crate) id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignRequest<'a> {
    pub(crate) pdf_url: &'a str,
    pub(crate) expiry: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignResult {
    #[serde(default)]
    pub(crate) signed_url: Option<String>,
}
