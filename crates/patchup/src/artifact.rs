//! Candidate binary retrieval
//!
//! Two independent ways of producing the new executable image:
//! - a bsdiff patch from `<diff-url>/<cmd>/<current>/<target>/<platform>`
//!   applied to the running executable
//! - a gzip-compressed full binary from `<bin-url>/<cmd>/<target>/<platform>.gz`
//!
//! Neither verifies the result nor touches persisted state.

use flate2::read::MultiGzDecoder;
use std::io::Read;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::{endpoint, escape, UpdateConfig};
use crate::error::{ConfigError, Result, UpdateError};
use crate::fetch::Fetcher;
use crate::patch::{PatchError, Patcher};
use crate::platform::platform;
use crate::resolver::RemoteVersionInfo;

/// Fetches patches and full binaries
pub struct ArtifactFetcher {
    fetcher: Arc<dyn Fetcher>,
    patcher: Arc<dyn Patcher>,
    platform: String,
}

impl ArtifactFetcher {
    /// Artifact fetcher for the running platform
    pub fn new(fetcher: Arc<dyn Fetcher>, patcher: Arc<dyn Patcher>) -> Self {
        Self {
            fetcher,
            patcher,
            platform: platform(),
        }
    }

    /// Override the platform identifier
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    /// Patch URL, or `None` when no diff URL is configured
    pub fn patch_url(&self, config: &UpdateConfig, info: &RemoteVersionInfo) -> Option<String> {
        let base = config.diff_url()?;

        Some(endpoint(
            base,
            &format!(
                "{}/{}/{}/{}",
                escape(config.cmd_name()),
                escape(config.current_version()),
                escape(&info.version),
                escape(&self.platform)
            ),
        ))
    }

    /// Full binary URL
    pub fn full_binary_url(&self, config: &UpdateConfig, info: &RemoteVersionInfo) -> Result<String> {
        let base = config.bin_url().ok_or(ConfigError::MissingUrl {
            name: "full-binary",
        })?;

        Ok(endpoint(
            base,
            &format!(
                "{}/{}/{}.gz",
                escape(config.cmd_name()),
                escape(&info.version),
                escape(&self.platform)
            ),
        ))
    }

    /// Fetch the patch from the current to the target version and apply it to `old`
    ///
    /// The patch is applied on a blocking worker. Once started it runs to
    /// completion even if this future is dropped; the result is then discarded.
    pub async fn fetch_and_patch(
        &self,
        old: Vec<u8>,
        config: &UpdateConfig,
        info: &RemoteVersionInfo,
    ) -> Result<Vec<u8>> {
        let url = self
            .patch_url(config, info)
            .ok_or(ConfigError::MissingUrl { name: "diff" })?;

        debug!(
            patch_url = %url,
            cmd_name = config.cmd_name(),
            current_version = config.current_version(),
            info_version = %info.version,
            platform = %self.platform,
            "Starting to fetch patch"
        );

        let patch = self.fetcher.fetch(&url).await.map_err(|source| {
            warn!(patch_url = %url, error = %source, "Errored fetching patch");
            UpdateError::PatchFetch {
                url: url.clone(),
                source,
            }
        })?;

        let patcher = Arc::clone(&self.patcher);
        let applied = tokio::task::spawn_blocking(move || patcher.patch(&old, &patch))
            .await
            .unwrap_or_else(|join_err| {
                Err(PatchError::Apply(std::io::Error::other(join_err.to_string())))
            });

        applied.map_err(|source| {
            warn!(patch_url = %url, error = %source, "Errored applying patch");
            UpdateError::PatchApply { url, source }
        })
    }

    /// Fetch and decompress the full target binary
    pub async fn fetch_full_binary(
        &self,
        config: &UpdateConfig,
        info: &RemoteVersionInfo,
    ) -> Result<Vec<u8>> {
        let url = self.full_binary_url(config, info)?;

        debug!(
            fetch_url = %url,
            cmd_name = config.cmd_name(),
            info_version = %info.version,
            platform = %self.platform,
            "Starting to fetch full binary"
        );

        let compressed = self.fetcher.fetch(&url).await.map_err(|source| {
            warn!(fetch_url = %url, error = %source, "Failed to fetch full binary");
            UpdateError::FullFetch {
                url: url.clone(),
                source,
            }
        })?;

        let mut binary = Vec::new();
        MultiGzDecoder::new(&compressed[..])
            .read_to_end(&mut binary)
            .map_err(|source| {
                warn!(fetch_url = %url, error = %source, "Failed to decompress full binary");
                UpdateError::Decompress { url, source }
            })?;

        Ok(binary)
    }
}
