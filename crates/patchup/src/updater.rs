//! Update orchestration
//!
//! One attempt walks through:
//!
//! ```text
//! Idle -> Checking -> Comparing -> {Patching | FullFetching} -> Verifying -> Installing -> {Done | Failed}
//! ```
//!
//! The candidate binary is produced by an ordered list of strategies. Any
//! failure of a strategy, including a digest mismatch, moves on to the next
//! one; only the last strategy's failure is returned. Nothing is retried
//! within an attempt beyond that single switch.

use std::fmt;
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::artifact::ArtifactFetcher;
use crate::config::UpdateConfig;
use crate::error::{ConfigError, Result, UpdateError};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::install::{current_executable, ExecutableInstaller, InstallFailure, Installer};
use crate::patch::{BsdiffPatcher, Patcher};
use crate::resolver::{RemoteVersionInfo, VersionResolver};
use crate::schedule::CheckScheduler;
use crate::verify::{digest, verify};

/// States of an update attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    Idle,
    Checking,
    Comparing,
    Patching,
    FullFetching,
    Verifying,
    Installing,
    Done,
    Failed,
}

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpdateState::Idle => "idle",
            UpdateState::Checking => "checking",
            UpdateState::Comparing => "comparing",
            UpdateState::Patching => "patching",
            UpdateState::FullFetching => "full-fetching",
            UpdateState::Verifying => "verifying",
            UpdateState::Installing => "installing",
            UpdateState::Done => "done",
            UpdateState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Ways of producing the candidate binary, in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Apply a binary diff to the running executable
    Patch,

    /// Download the full compressed binary
    FullBinary,
}

impl Strategy {
    /// Short human-readable name
    pub fn label(&self) -> &'static str {
        match self {
            Strategy::Patch => "patch",
            Strategy::FullBinary => "full binary",
        }
    }

    fn state(&self) -> UpdateState {
        match self {
            Strategy::Patch => UpdateState::Patching,
            Strategy::FullBinary => UpdateState::FullFetching,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Non-error result of an update cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// No update endpoints are configured
    Disabled,

    /// The scheduler declined to check
    Skipped,

    /// The published version is the running version
    UpToDate { version: String },

    /// The executable was replaced
    Updated {
        from: String,
        to: String,
        strategy: Strategy,
    },
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateOutcome::Disabled => write!(f, "updates disabled"),
            UpdateOutcome::Skipped => write!(f, "update check skipped"),
            UpdateOutcome::UpToDate { version } => write!(f, "already at latest version {}", version),
            UpdateOutcome::Updated { from, to, strategy } => {
                write!(f, "updated {} -> {} via {}", from, to, strategy)
            }
        }
    }
}

/// Read handle on the running executable
///
/// Held from `Comparing` until just before `Installing`; dropping it closes the
/// file on every exit path.
struct ExecutableHandle {
    path: PathBuf,
    file: File,
}

impl ExecutableHandle {
    fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            UpdateError::executable(format!("Couldn't open self executable {:?}", path), Some(e))
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    fn read_all(&mut self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.file
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.file.read_to_end(&mut bytes))
            .map_err(|e| {
                UpdateError::executable(
                    format!("Couldn't read self executable {:?}", self.path),
                    Some(e),
                )
            })?;
        Ok(bytes)
    }
}

impl Drop for ExecutableHandle {
    fn drop(&mut self) {
        debug!(path = ?self.path, "Closed self executable");
    }
}

/// Self-update orchestrator
///
/// Every collaborator is a field, so each updater is configured and tested
/// independently. Concurrent attempts sharing one state directory are not
/// supported; run at most one background updater per process.
pub struct Updater {
    config: UpdateConfig,
    executable: PathBuf,
    scheduler: CheckScheduler,
    resolver: VersionResolver,
    artifacts: ArtifactFetcher,
    installer: Arc<dyn Installer>,
}

impl Updater {
    /// Start building an updater for `config`
    pub fn builder(config: UpdateConfig) -> UpdaterBuilder {
        UpdaterBuilder::new(config)
    }

    /// Configuration in use
    pub fn config(&self) -> &UpdateConfig {
        &self.config
    }

    /// Executable being patched and replaced
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Check scheduler, with the resolved state directory
    pub fn scheduler(&self) -> &CheckScheduler {
        &self.scheduler
    }

    /// Run one full cycle: state directory, schedule, preflight, update
    pub async fn run(&self) -> Result<UpdateOutcome> {
        if !self.config.is_enabled() {
            debug!("No update URLs configured, updates disabled");
            return Ok(UpdateOutcome::Disabled);
        }

        self.transition(UpdateState::Checking);
        let state_dir = self.scheduler.state_dir();
        fs::create_dir_all(state_dir).map_err(|source| UpdateError::Directory {
            path: state_dir.to_path_buf(),
            source,
        })?;

        if !self.scheduler.want_check(&self.config) {
            self.transition(UpdateState::Idle);
            return Ok(UpdateOutcome::Skipped);
        }

        self.installer
            .preflight()
            .map_err(|source| UpdateError::NotInstallable {
                path: self.executable.clone(),
                source,
            })?;

        self.update().await
    }

    /// Check for a new version and install it, ignoring the schedule
    pub async fn update(&self) -> Result<UpdateOutcome> {
        let result = self.try_update().await;

        match &result {
            Ok(_) => self.transition(UpdateState::Done),
            Err(e) => {
                self.transition(UpdateState::Failed);
                if e.is_severe() {
                    error!(error = %e, "Update failed and the executable may be inconsistent");
                }
            }
        }

        result
    }

    /// Run `run()` on a background task, logging its outcome
    pub fn spawn_background(self: Arc<Self>) -> JoinHandle<Result<UpdateOutcome>> {
        tokio::spawn(async move {
            let result = self.run().await;
            match &result {
                Ok(outcome) => info!(outcome = %outcome, "Background update finished"),
                Err(e) if e.is_severe() => error!(error = %e, "Background update failed"),
                Err(e) => warn!(error = %e, "Background update failed"),
            }
            result
        })
    }

    async fn try_update(&self) -> Result<UpdateOutcome> {
        self.transition(UpdateState::Comparing);
        let mut executable = ExecutableHandle::open(&self.executable)?;

        let info = self.resolver.fetch_info(&self.config).await?;
        if info.version == self.config.current_version() {
            debug!(version = %info.version, "Already at latest version");
            return Ok(UpdateOutcome::UpToDate {
                version: info.version,
            });
        }

        info!(
            from = self.config.current_version(),
            to = %info.version,
            "New version available"
        );

        let (strategy, candidate) = self.fetch_verified(&mut executable, &info).await?;

        // Some platforms refuse to rename a file with an open handle
        drop(executable);

        self.transition(UpdateState::Installing);
        self.installer
            .install(&candidate)
            .map_err(|failure| match failure {
                InstallFailure::Failed(e) => UpdateError::Install(e),
                InstallFailure::RecoveryFailed { install, recovery } => {
                    UpdateError::InstallRecovery { install, recovery }
                }
            })?;

        info!(
            from = self.config.current_version(),
            to = %info.version,
            strategy = %strategy,
            "Update installed"
        );

        Ok(UpdateOutcome::Updated {
            from: self.config.current_version().to_string(),
            to: info.version,
            strategy,
        })
    }

    /// Strategies available for this configuration, cheapest first
    pub fn strategies(&self) -> Vec<Strategy> {
        let mut strategies = Vec::with_capacity(2);
        if self.config.diff_url().is_some() {
            strategies.push(Strategy::Patch);
        }
        strategies.push(Strategy::FullBinary);
        strategies
    }

    async fn fetch_verified(
        &self,
        executable: &mut ExecutableHandle,
        info: &RemoteVersionInfo,
    ) -> Result<(Strategy, Vec<u8>)> {
        let mut strategies = self.strategies().into_iter().peekable();

        while let Some(strategy) = strategies.next() {
            match self.attempt(strategy, executable, info).await {
                Ok(candidate) => return Ok((strategy, candidate)),
                Err(e) if strategies.peek().is_some() => {
                    if e.is_hash_mismatch() {
                        debug!(strategy = %strategy, "Hash mismatch, falling back");
                    } else {
                        debug!(strategy = %strategy, error = %e, "Strategy failed, falling back");
                    }
                }
                Err(e) => {
                    if e.is_hash_mismatch() {
                        debug!(strategy = %strategy, "Hash mismatch from last strategy");
                    } else {
                        debug!(strategy = %strategy, error = %e, "Last strategy failed");
                    }
                    return Err(e);
                }
            }
        }

        Err(ConfigError::MissingUrl {
            name: "full-binary",
        }
        .into())
    }

    async fn attempt(
        &self,
        strategy: Strategy,
        executable: &mut ExecutableHandle,
        info: &RemoteVersionInfo,
    ) -> Result<Vec<u8>> {
        self.transition(strategy.state());

        let candidate = match strategy {
            Strategy::Patch => {
                let old = executable.read_all()?;
                self.artifacts
                    .fetch_and_patch(old, &self.config, info)
                    .await?
            }
            Strategy::FullBinary => self.artifacts.fetch_full_binary(&self.config, info).await?,
        };

        self.transition(UpdateState::Verifying);
        if !verify(&candidate, &info.sha256) {
            return Err(UpdateError::HashMismatch {
                strategy: strategy.label(),
                expected: hex::encode(info.sha256),
                actual: hex::encode(digest(&candidate)),
            });
        }

        Ok(candidate)
    }

    fn transition(&self, state: UpdateState) {
        debug!(cmd_name = self.config.cmd_name(), state = %state, "Update state");
    }
}

/// Builder for `Updater`
pub struct UpdaterBuilder {
    config: UpdateConfig,
    fetcher: Option<Arc<dyn Fetcher>>,
    patcher: Option<Arc<dyn Patcher>>,
    installer: Option<Arc<dyn Installer>>,
    scheduler: Option<CheckScheduler>,
    platform: Option<String>,
}

impl UpdaterBuilder {
    fn new(config: UpdateConfig) -> Self {
        Self {
            config,
            fetcher: None,
            patcher: None,
            installer: None,
            scheduler: None,
            platform: None,
        }
    }

    /// Use a custom fetch capability (defaults to `HttpFetcher`)
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Use a custom patch capability (defaults to `BsdiffPatcher`)
    pub fn patcher(mut self, patcher: Arc<dyn Patcher>) -> Self {
        self.patcher = Some(patcher);
        self
    }

    /// Use a custom install capability (defaults to `ExecutableInstaller`)
    pub fn installer(mut self, installer: Arc<dyn Installer>) -> Self {
        self.installer = Some(installer);
        self
    }

    /// Use a custom scheduler instead of one over the resolved state directory
    pub fn scheduler(mut self, scheduler: CheckScheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Override the platform identifier
    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Build the updater, filling in default collaborators
    pub fn build(self) -> Result<Updater> {
        let executable = match self.config.executable_path() {
            Some(path) => path.to_path_buf(),
            None => current_executable().map_err(|e| {
                UpdateError::executable("Couldn't get path to self executable", Some(e))
            })?,
        };

        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpFetcher::new().map_err(ConfigError::HttpClient)?),
        };
        let patcher = self
            .patcher
            .unwrap_or_else(|| Arc::new(BsdiffPatcher) as Arc<dyn Patcher>);
        let installer = self
            .installer
            .unwrap_or_else(|| Arc::new(ExecutableInstaller::new(&executable)) as Arc<dyn Installer>);

        let scheduler = self.scheduler.unwrap_or_else(|| {
            let state_dir = self.config.resolve_state_dir(&executable);
            debug!(executable = ?executable, state_dir = ?state_dir, "Directory to store update state");
            CheckScheduler::new(state_dir)
        });

        let mut resolver = VersionResolver::new(Arc::clone(&fetcher));
        let mut artifacts = ArtifactFetcher::new(fetcher, patcher);
        if let Some(platform) = self.platform {
            resolver = resolver.with_platform(platform.clone());
            artifacts = artifacts.with_platform(platform);
        }

        Ok(Updater {
            config: self.config,
            executable,
            scheduler,
            resolver,
            artifacts,
            installer,
        })
    }
}
