//! Error types for patchup

use std::path::PathBuf;
use thiserror::Error;

use crate::fetch::TransportError;
use crate::patch::PatchError;
use crate::resolver::MetadataError;

/// Result type alias using patchup's error type
pub type Result<T> = std::result::Result<T, UpdateError>;

/// Terminal errors of an update attempt
///
/// Only one of these is ever returned per attempt. Failures of the patch
/// strategy are logged and replaced by the outcome of the full-binary
/// strategy, so `PatchFetch`, `PatchApply` and a patch-side `HashMismatch`
/// only surface when no fallback was possible.
#[derive(Error, Debug)]
pub enum UpdateError {
    /// Invalid configuration
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),

    /// State directory could not be created
    #[error("Couldn't create directory for storing update state (dir={path:?}): {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The running executable could not be located, opened or read
    #[error("Couldn't access the running executable: {message}")]
    Executable {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// The installer reported that the executable cannot be replaced
    #[error("Wants to update but can't replace {path:?}: {source}")]
    NotInstallable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Version metadata could not be fetched
    #[error("Couldn't fetch version metadata (url={url}): {source}")]
    MetadataFetch {
        url: String,
        #[source]
        source: TransportError,
    },

    /// Version metadata was fetched but is not usable
    #[error("Malformed version metadata (url={url}): {source}")]
    MalformedMetadata {
        url: String,
        #[source]
        source: MetadataError,
    },

    /// Patch blob could not be fetched
    #[error("Errored fetching patch (url={url}): {source}")]
    PatchFetch {
        url: String,
        #[source]
        source: TransportError,
    },

    /// Patch blob was rejected by the patch algorithm
    #[error("Errored applying patch (url={url}): {source}")]
    PatchApply {
        url: String,
        #[source]
        source: PatchError,
    },

    /// Candidate binary digest does not match the published digest
    #[error("New file hash mismatch after {strategy} (expected {expected}, got {actual})")]
    HashMismatch {
        strategy: &'static str,
        expected: String,
        actual: String,
    },

    /// Full binary could not be fetched
    #[error("Failed to fetch full binary (url={url}): {source}")]
    FullFetch {
        url: String,
        #[source]
        source: TransportError,
    },

    /// Full binary could not be decompressed
    #[error("Failed to decompress full binary (url={url}): {source}")]
    Decompress {
        url: String,
        #[source]
        source: std::io::Error,
    },

    /// Install failed, the previous executable is still in place
    #[error("Failed installing update: {0}")]
    Install(#[source] std::io::Error),

    /// Install failed and restoring the previous executable failed too
    #[error("Update and recovery errors: install: {install}; recovery: {recovery}")]
    InstallRecovery {
        install: std::io::Error,
        recovery: std::io::Error,
    },
}

impl UpdateError {
    /// Create an executable access error
    pub fn executable(message: impl Into<String>, source: Option<std::io::Error>) -> Self {
        Self::Executable {
            message: message.into(),
            source,
        }
    }

    /// Whether the executable on disk may now be in an inconsistent state
    pub fn is_severe(&self) -> bool {
        matches!(self, Self::InstallRecovery { .. })
    }

    /// Whether this is a digest mismatch
    pub fn is_hash_mismatch(&self) -> bool {
        matches!(self, Self::HashMismatch { .. })
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A base URL is not a valid absolute URL
    #[error("Invalid {name} URL '{value}': {source}")]
    InvalidUrl {
        name: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },

    /// Some but not all of the required URLs are set
    #[error("Missing {name} URL: metadata and full-binary URLs must be set together")]
    MissingUrl { name: &'static str },

    /// A required field is empty
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    /// Settings file could not be read
    #[error("Couldn't read settings file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Settings file could not be parsed
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml_ng::Error,
    },

    /// Default HTTP client could not be created
    #[error("Failed to create HTTP client: {0}")]
    HttpClient(#[source] TransportError),

    /// Environment override holds an unusable value
    #[error("{var} {message}")]
    InvalidEnv { var: &'static str, message: String },
}

impl ConfigError {
    /// Create an invalid environment override error
    pub fn invalid_env(var: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidEnv {
            var,
            message: message.into(),
        }
    }
}
