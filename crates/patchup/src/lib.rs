//! Self-update engine for standalone executables
//!
//! Provides:
//! - Throttled update checks with a persisted, jittered check token
//! - Version metadata resolution over a pluggable fetcher
//! - Binary diff (bsdiff) updates with full-binary fallback
//! - SHA-256 verification of every candidate binary
//! - In-place executable replacement with rollback
//!
//! # Example
//!
//! ```no_run
//! use patchup::{UpdateConfig, Updater};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = UpdateConfig::builder("myapp", env!("CARGO_PKG_VERSION"))
//!         .api_url("https://updates.example.com/")
//!         .bin_url("https://dist.example.com/")
//!         .diff_url("https://patches.example.com/")
//!         .state_dir("update/")
//!         .build()?;
//!
//!     let updater = Updater::builder(config).build()?;
//!     let outcome = updater.run().await?;
//!     println!("{outcome}");
//!     Ok(())
//! }
//! ```

pub mod artifact;
pub mod config;
pub mod error;
pub mod fetch;
pub mod install;
pub mod patch;
pub mod platform;
pub mod resolver;
pub mod schedule;
pub mod updater;
pub mod verify;

pub use artifact::ArtifactFetcher;
pub use config::{SettingsLoader, UpdateConfig, UpdateConfigBuilder, UpdaterSettings};
pub use error::{ConfigError, Result, UpdateError};
pub use fetch::{Fetcher, HttpFetcher, TransportError};
pub use install::{ExecutableInstaller, InstallFailure, Installer};
pub use patch::{BsdiffPatcher, PatchError, Patcher};
pub use platform::platform;
pub use resolver::{MetadataError, RemoteVersionInfo, VersionResolver};
pub use schedule::{CheckDecision, CheckScheduler, TokenState};
pub use updater::{Strategy, UpdateOutcome, UpdateState, Updater, UpdaterBuilder};
pub use verify::{digest, verify};

/// Version string of builds that must never update themselves
pub const DEV_VERSION: &str = "dev";

/// File name of the check token inside the state directory
pub const CHECK_TOKEN_FILE: &str = "cktime";
