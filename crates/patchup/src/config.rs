//! Update configuration
//!
//! `UpdateConfig` is the validated, immutable configuration of one updater.
//! `UpdaterSettings` is its serialisable form, loaded by `SettingsLoader` with
//! the following precedence (low to high):
//! 1. Built-in defaults
//! 2. Settings file (YAML, kebab-case keys)
//! 3. Environment variables (PATCHUP_* prefix)
//! 4. Programmatic overrides (handled by caller)

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;
use crate::fetch::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};

/// Default state directory, relative to the executable's directory
pub const DEFAULT_STATE_DIR: &str = "update";

/// Validated configuration of an updater
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    current_version: String,
    cmd_name: String,
    api_url: Option<Url>,
    bin_url: Option<Url>,
    diff_url: Option<Url>,
    state_dir: PathBuf,
    force_check: bool,
    executable_path: Option<PathBuf>,
}

impl UpdateConfig {
    /// Start building a configuration for `cmd_name` running `current_version`
    pub fn builder(
        cmd_name: impl Into<String>,
        current_version: impl Into<String>,
    ) -> UpdateConfigBuilder {
        UpdateConfigBuilder::new(cmd_name, current_version)
    }

    /// Currently running version
    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    /// Command name, one published binary
    pub fn cmd_name(&self) -> &str {
        &self.cmd_name
    }

    /// Base URL of the version metadata
    pub fn api_url(&self) -> Option<&Url> {
        self.api_url.as_ref()
    }

    /// Base URL of full binaries
    pub fn bin_url(&self) -> Option<&Url> {
        self.bin_url.as_ref()
    }

    /// Base URL of patches; `None` disables the patch strategy
    pub fn diff_url(&self) -> Option<&Url> {
        self.diff_url.as_ref()
    }

    /// State directory as configured (possibly relative)
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Check regardless of the check token
    pub fn force_check(&self) -> bool {
        self.force_check
    }

    /// Explicit executable path, if one was configured
    pub fn executable_path(&self) -> Option<&Path> {
        self.executable_path.as_deref()
    }

    /// Whether update endpoints are configured at all
    pub fn is_enabled(&self) -> bool {
        self.api_url.is_some() && self.bin_url.is_some()
    }

    /// Resolve the state directory against the executable's directory
    ///
    /// Absolute state directories are returned unchanged.
    pub fn resolve_state_dir(&self, executable: &Path) -> PathBuf {
        if self.state_dir.is_absolute() {
            return self.state_dir.clone();
        }

        executable
            .parent()
            .map(|dir| dir.join(&self.state_dir))
            .unwrap_or_else(|| self.state_dir.clone())
    }

    /// Copy of this configuration with the force-check flag set
    pub fn with_force_check(mut self, force: bool) -> Self {
        self.force_check = force;
        self
    }

    /// Copy of this configuration targeting another executable
    pub fn with_executable_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable_path = Some(path.into());
        self
    }
}

/// Builder for `UpdateConfig`
#[derive(Debug, Clone)]
pub struct UpdateConfigBuilder {
    current_version: String,
    cmd_name: String,
    api_url: Option<String>,
    bin_url: Option<String>,
    diff_url: Option<String>,
    state_dir: PathBuf,
    force_check: bool,
    executable_path: Option<PathBuf>,
}

impl UpdateConfigBuilder {
    fn new(cmd_name: impl Into<String>, current_version: impl Into<String>) -> Self {
        Self {
            current_version: current_version.into(),
            cmd_name: cmd_name.into(),
            api_url: None,
            bin_url: None,
            diff_url: None,
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            force_check: false,
            executable_path: None,
        }
    }

    /// Use one base URL for metadata, full binaries and patches
    pub fn base_url(self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.api_url(url.clone()).bin_url(url.clone()).diff_url(url)
    }

    /// Set the metadata base URL
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    /// Set the full-binary base URL
    pub fn bin_url(mut self, url: impl Into<String>) -> Self {
        self.bin_url = Some(url.into());
        self
    }

    /// Set the patch base URL
    pub fn diff_url(mut self, url: impl Into<String>) -> Self {
        self.diff_url = Some(url.into());
        self
    }

    /// Set the state directory
    pub fn state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = dir.into();
        self
    }

    /// Check regardless of the check token
    pub fn force_check(mut self, force: bool) -> Self {
        self.force_check = force;
        self
    }

    /// Override the executable to patch and replace
    pub fn executable_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable_path = Some(path.into());
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<UpdateConfig, ConfigError> {
        if self.cmd_name.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "cmd-name" });
        }
        if self.current_version.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "current-version",
            });
        }

        let api_url = parse_url("metadata", self.api_url)?;
        let bin_url = parse_url("full-binary", self.bin_url)?;
        let diff_url = parse_url("diff", self.diff_url)?;

        let any_set = api_url.is_some() || bin_url.is_some() || diff_url.is_some();
        if any_set {
            if api_url.is_none() {
                return Err(ConfigError::MissingUrl { name: "metadata" });
            }
            if bin_url.is_none() {
                return Err(ConfigError::MissingUrl {
                    name: "full-binary",
                });
            }
        }

        Ok(UpdateConfig {
            current_version: self.current_version,
            cmd_name: self.cmd_name,
            api_url,
            bin_url,
            diff_url,
            state_dir: self.state_dir,
            force_check: self.force_check,
            executable_path: self.executable_path,
        })
    }
}

fn parse_url(name: &'static str, value: Option<String>) -> Result<Option<Url>, ConfigError> {
    match value {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => Url::parse(value.trim())
            .map(Some)
            .map_err(|source| ConfigError::InvalidUrl {
                name,
                value,
                source,
            }),
    }
}

/// Escape one URL path segment the way query values are escaped
pub(crate) fn escape(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}

/// Join a base URL and an already escaped path with exactly one separator
pub(crate) fn endpoint(base: &Url, path: &str) -> String {
    format!("{}/{}", base.as_str().trim_end_matches('/'), path)
}

/// Serialisable updater settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UpdaterSettings {
    /// Base URL for version metadata
    #[serde(default)]
    pub api_url: Option<String>,

    /// Base URL for full binary downloads
    #[serde(default)]
    pub bin_url: Option<String>,

    /// Base URL for patch downloads
    #[serde(default)]
    pub diff_url: Option<String>,

    /// Directory for update state, relative to the executable unless absolute
    #[serde(default = "default_state_dir")]
    pub state_dir: Utf8PathBuf,

    /// Command name override
    #[serde(default)]
    pub cmd_name: Option<String>,

    /// Check regardless of the check token
    #[serde(default)]
    pub force_check: bool,

    /// HTTP timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// User agent string for HTTP requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for UpdaterSettings {
    fn default() -> Self {
        Self {
            api_url: None,
            bin_url: None,
            diff_url: None,
            state_dir: default_state_dir(),
            cmd_name: None,
            force_check: false,
            http_timeout_secs: default_http_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_state_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_STATE_DIR)
}

fn default_http_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl UpdaterSettings {
    /// HTTP timeout as a duration
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Command name from the settings, or `default` when they name none
    pub fn cmd_name_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.cmd_name.as_deref().unwrap_or(default)
    }

    /// Build an `UpdateConfig` for exactly `cmd_name` at `current_version`
    ///
    /// The settings' own `cmd-name` is not applied here; resolve it with
    /// `cmd_name_or` when the caller has no stronger source.
    pub fn to_config(
        &self,
        cmd_name: &str,
        current_version: &str,
    ) -> Result<UpdateConfig, ConfigError> {
        let mut builder = UpdateConfig::builder(cmd_name, current_version)
            .state_dir(self.state_dir.as_std_path())
            .force_check(self.force_check);

        if let Some(url) = &self.api_url {
            builder = builder.api_url(url.clone());
        }
        if let Some(url) = &self.bin_url {
            builder = builder.bin_url(url.clone());
        }
        if let Some(url) = &self.diff_url {
            builder = builder.diff_url(url.clone());
        }

        builder.build()
    }
}

/// Loads `UpdaterSettings` from an optional file plus environment overrides
pub struct SettingsLoader {
    path: Option<Utf8PathBuf>,
}

impl SettingsLoader {
    /// Loader that only applies defaults and environment overrides
    pub fn new() -> Self {
        Self { path: None }
    }

    /// Loader that also reads `path` when it exists
    pub fn with_path(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Load settings with hierarchical precedence
    pub fn load(&self) -> Result<UpdaterSettings, ConfigError> {
        let mut settings = UpdaterSettings::default();

        if let Some(path) = &self.path {
            if path.exists() {
                settings = Self::load_yaml_file(path)?;
            }
        }

        Self::apply_env_overrides(settings)
    }

    fn load_yaml_file(path: &Utf8Path) -> Result<UpdaterSettings, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;

        serde_yaml_ng::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    fn apply_env_overrides(mut settings: UpdaterSettings) -> Result<UpdaterSettings, ConfigError> {
        if let Ok(val) = env::var("PATCHUP_API_URL") {
            settings.api_url = Some(val);
        }

        if let Ok(val) = env::var("PATCHUP_BIN_URL") {
            settings.bin_url = Some(val);
        }

        if let Ok(val) = env::var("PATCHUP_DIFF_URL") {
            settings.diff_url = Some(val);
        }

        if let Ok(val) = env::var("PATCHUP_STATE_DIR") {
            settings.state_dir = Utf8PathBuf::from(val);
        }

        if let Ok(val) = env::var("PATCHUP_CMD_NAME") {
            settings.cmd_name = Some(val);
        }

        if let Ok(val) = env::var("PATCHUP_FORCE_CHECK") {
            settings.force_check = val.parse().map_err(|_| {
                ConfigError::invalid_env("PATCHUP_FORCE_CHECK", "must be true or false")
            })?;
        }

        if let Ok(val) = env::var("PATCHUP_HTTP_TIMEOUT_SECS") {
            settings.http_timeout_secs = val.parse().map_err(|_| {
                ConfigError::invalid_env("PATCHUP_HTTP_TIMEOUT_SECS", "must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("PATCHUP_USER_AGENT") {
            settings.user_agent = val;
        }

        Ok(settings)
    }

    /// Settings file path, if any
    pub fn path(&self) -> Option<&Utf8Path> {
        self.path.as_deref()
    }
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}
