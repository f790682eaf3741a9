//! Remote version metadata
//!
//! Metadata lives at `<api-url>/<cmd-name>/<platform>.json`:
//!
//! ```json
//! { "Version": "1.1.0", "Sha256": "<base64 of the 32-byte digest>" }
//! ```

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::config::{endpoint, escape, UpdateConfig};
use crate::error::{ConfigError, Result, UpdateError};
use crate::fetch::Fetcher;
use crate::platform::platform;
use crate::verify::DIGEST_LEN;

/// Reasons a metadata document is rejected
#[derive(Error, Debug)]
pub enum MetadataError {
    /// Body is not the expected JSON object
    #[error("Couldn't decode JSON: {0}")]
    Json(#[source] serde_json::Error),

    /// Digest is not valid base64
    #[error("Bad cmd hash in JSON info: {0}")]
    Digest(#[source] base64::DecodeError),

    /// Digest decodes to the wrong number of bytes
    #[error("Bad cmd hash in JSON info: expected {expected} bytes, got {actual}")]
    DigestLength { expected: usize, actual: usize },
}

/// Latest published version and the digest of its binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteVersionInfo {
    /// Version identifier
    pub version: String,

    /// SHA-256 of the uncompressed binary
    pub sha256: [u8; DIGEST_LEN],
}

/// Wire format of the metadata document
#[derive(Debug, Serialize, Deserialize)]
struct MetadataDocument {
    #[serde(rename = "Version")]
    version: String,

    #[serde(rename = "Sha256")]
    sha256: String,
}

impl RemoteVersionInfo {
    /// Metadata describing `binary` published as `version`
    pub fn for_binary(version: impl Into<String>, binary: &[u8]) -> Self {
        Self {
            version: version.into(),
            sha256: crate::verify::digest(binary),
        }
    }

    /// Serialise to the metadata document format
    pub fn to_json(&self) -> String {
        let document = MetadataDocument {
            version: self.version.clone(),
            sha256: BASE64.encode(self.sha256),
        };
        // A struct of two strings always serialises
        serde_json::to_string(&document).unwrap_or_default()
    }

    /// Parse a metadata document
    pub fn from_json(body: &[u8]) -> std::result::Result<Self, MetadataError> {
        let document: MetadataDocument =
            serde_json::from_slice(body).map_err(MetadataError::Json)?;

        let digest = BASE64
            .decode(document.sha256.trim())
            .map_err(MetadataError::Digest)?;

        let sha256: [u8; DIGEST_LEN] =
            digest
                .try_into()
                .map_err(|bytes: Vec<u8>| MetadataError::DigestLength {
                    expected: DIGEST_LEN,
                    actual: bytes.len(),
                })?;

        Ok(Self {
            version: document.version,
            sha256,
        })
    }
}

/// Fetches version metadata for one command
pub struct VersionResolver {
    fetcher: Arc<dyn Fetcher>,
    platform: String,
}

impl VersionResolver {
    /// Resolver for the running platform
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            platform: platform(),
        }
    }

    /// Override the platform identifier
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    /// Metadata URL for `config`
    pub fn metadata_url(&self, config: &UpdateConfig) -> Result<String> {
        let base = config
            .api_url()
            .ok_or(ConfigError::MissingUrl { name: "metadata" })?;

        Ok(endpoint(
            base,
            &format!(
                "{}/{}.json",
                escape(config.cmd_name()),
                escape(&self.platform)
            ),
        ))
    }

    /// Fetch and decode the latest version metadata
    ///
    /// No retries happen here; a failed fetch is returned to the caller.
    pub async fn fetch_info(&self, config: &UpdateConfig) -> Result<RemoteVersionInfo> {
        let url = self.metadata_url(config)?;
        debug!(url = %url, "Fetching version metadata");

        let body = self
            .fetcher
            .fetch(&url)
            .await
            .map_err(|source| UpdateError::MetadataFetch {
                url: url.clone(),
                source,
            })?;

        let info = RemoteVersionInfo::from_json(&body)
            .map_err(|source| UpdateError::MalformedMetadata {
                url: url.clone(),
                source,
            })?;

        debug!(url = %url, version = %info.version, "Resolved latest version");
        Ok(info)
    }
}
