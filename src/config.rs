//! Configuration types for bulk-certs

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Environment variable overriding [`ServiceConfig::base_url`]
pub const ENV_BASE_URL: &str = "BULK_CERTS_BASE_URL";

/// Environment variable overriding [`ServiceConfig::auth_token`]
pub const ENV_AUTH_TOKEN: &str = "BULK_CERTS_AUTH_TOKEN";

/// Signed URL lifetime used when none is configured
pub const DEFAULT_SIGNED_URL_EXPIRY_SECS: u64 = 3600;

/// Remote certificate service settings
///
/// All three stage endpoints are resolved relative to `base_url` and share
/// one bearer token.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the certificate/registry services (default: "http://localhost:9000/")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token sent with every service call
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Certificate generation endpoint (default: "cert/v1/certs/generate")
    #[serde(default = "default_generate_path")]
    pub generate_path: String,

    /// Registry add endpoint (default: "certreg/v1/certs/add")
    #[serde(default = "default_register_path")]
    pub register_path: String,

    /// Signed download link endpoint (default: "certreg/v1/certs/download")
    #[serde(default = "default_sign_path")]
    pub sign_path: String,

    /// Per-request timeout, including artifact downloads (default: 30s)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Signed URL lifetime in seconds (None = service default of 3600)
    #[serde(default)]
    pub signed_url_expiry_secs: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            auth_token: None,
            generate_path: default_generate_path(),
            register_path: default_register_path(),
            sign_path: default_sign_path(),
            request_timeout: default_request_timeout(),
            signed_url_expiry_secs: None,
        }
    }
}

/// Batch scheduling settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum record pipelines in flight at once (default: 10)
    #[serde(default = "default_max_concurrent_records")]
    pub max_concurrent_records: usize,

    /// Extension of downloaded artifacts (default: "pdf")
    #[serde(default = "default_artifact_extension")]
    pub artifact_extension: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_records: default_max_concurrent_records(),
            artifact_extension: default_artifact_extension(),
        }
    }
}

/// Local output layout
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root of per-job directories and archives (default: "./Downloads")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Summary file written into each job directory (default: "result.csv")
    #[serde(default = "default_summary_file_name")]
    pub summary_file_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            summary_file_name: default_summary_file_name(),
        }
    }
}

impl StorageConfig {
    /// Directory holding a job's artifacts and summary
    pub fn job_dir(&self, id: crate::types::JobId) -> PathBuf {
        self.output_dir.join(id.to_string())
    }
}

/// Job ledger storage
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Database path (default: "./bulk-certs.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Issuer identity printed on generated certificates
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issuer {
    /// Issuing organisation name
    #[serde(default)]
    pub name: String,
    /// Issuing organisation URL
    #[serde(default)]
    pub url: String,
}

/// One signatory printed on generated certificates
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signatory {
    /// Signatory name
    pub name: String,
    /// Signatory designation (e.g. "Director")
    #[serde(default)]
    pub designation: String,
    /// Signature image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Certificate template settings copied into every generate request
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateTemplate {
    /// Certificate title
    #[serde(default)]
    pub name: String,
    /// Certificate description
    #[serde(default)]
    pub description: String,
    /// Issuer identity
    #[serde(default)]
    pub issuer: Issuer,
    /// HTML template rendered by the generation service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_template: Option<String>,
    /// Organisation that owns issued certificates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    /// Signatories
    #[serde(default)]
    pub signatory_list: Vec<Signatory>,
}

/// Main configuration for BulkIssuer
///
/// Fields are organized into logical sub-configs:
/// - [`service`](ServiceConfig) — remote certificate services
/// - [`batch`](BatchConfig) — concurrency and artifact naming
/// - [`storage`](StorageConfig) — output directories and summary file
/// - [`persistence`](PersistenceConfig) — job ledger database
/// - [`template`](CertificateTemplate) — certificate content
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote certificate service settings
    #[serde(default)]
    pub service: ServiceConfig,

    /// Batch scheduling settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Local output layout
    #[serde(default)]
    pub storage: StorageConfig,

    /// Job ledger storage
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Certificate template
    #[serde(default)]
    pub template: CertificateTemplate,
}

impl Config {
    /// Check settings that would make every job fail.
    pub fn validate(&self) -> Result<()> {
        if self.batch.max_concurrent_records == 0 {
            return Err(Error::Config {
                message: "max_concurrent_records must be at least 1".to_string(),
                key: Some("batch.max_concurrent_records".to_string()),
            });
        }

        if let Err(e) = url::Url::parse(&self.service.base_url) {
            return Err(Error::Config {
                message: format!("invalid base_url '{}': {}", self.service.base_url, e),
                key: Some("service.base_url".to_string()),
            });
        }

        let summary = self.storage.summary_file_name.as_str();
        if summary.trim().is_empty() {
            return Err(Error::Config {
                message: "summary_file_name must not be empty".to_string(),
                key: Some("storage.summary_file_name".to_string()),
            });
        }

        // Must name a file inside the job directory
        let bare = std::path::Path::new(summary).file_name().and_then(|n| n.to_str());
        if bare != Some(summary) || summary.contains('\\') {
            return Err(Error::Config {
                message: format!("summary_file_name '{}' must be a plain file name", summary),
                key: Some("storage.summary_file_name".to_string()),
            });
        }

        Ok(())
    }

    /// Override service settings from the process environment.
    ///
    /// Reads [`ENV_BASE_URL`] and [`ENV_AUTH_TOKEN`]; unset or empty variables
    /// leave the current values untouched.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.service.base_url = url;
        }
        if let Some(token) = lookup(ENV_AUTH_TOKEN).filter(|v| !v.trim().is_empty()) {
            self.service.auth_token = Some(token);
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:9000/".to_string()
}

fn default_generate_path() -> String {
    "cert/v1/certs/generate".to_string()
}

fn default_register_path() -> String {
    "certreg/v1/certs/add".to_string()
}

fn default_sign_path() -> String {
    "certreg/v1/certs/download".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_concurrent_records() -> usize {
    10
}

fn default_artifact_extension() -> String {
    "pdf".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./Downloads")
}

fn default_summary_file_name() -> String {
    "result.csv".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./bulk-certs.db")
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
