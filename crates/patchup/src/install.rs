//! In-place replacement of the running executable
//!
//! The new image is written to a temporary file next to the target, the
//! target is moved aside to `.<name>.old`, and the temporary file is renamed
//! into place. If that rename fails the old image is moved back. Only when the
//! move back also fails is the target left in an inconsistent state, reported
//! as `InstallFailure::RecoveryFailed`.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Failure of an install attempt
#[derive(Error, Debug)]
pub enum InstallFailure {
    /// Install failed, the previous executable is intact
    #[error("install failed: {0}")]
    Failed(#[source] io::Error),

    /// Install failed and restoring the previous executable failed too
    #[error("install failed ({install}) and recovery failed ({recovery})")]
    RecoveryFailed {
        install: io::Error,
        recovery: io::Error,
    },
}

/// Atomic install capability
pub trait Installer: Send + Sync {
    /// Check that the target can be replaced at all
    fn preflight(&self) -> io::Result<()> {
        Ok(())
    }

    /// Replace the target with `new_binary`
    fn install(&self, new_binary: &[u8]) -> Result<(), InstallFailure>;
}

/// Path of the running executable, with symlinks resolved
pub fn current_executable() -> io::Result<PathBuf> {
    let path = std::env::current_exe()?;
    Ok(fs::canonicalize(&path).unwrap_or(path))
}

/// Replaces an executable file on disk
#[derive(Debug, Clone)]
pub struct ExecutableInstaller {
    target: PathBuf,
}

impl ExecutableInstaller {
    /// Installer replacing `target`
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
        }
    }

    /// Installer replacing the running executable
    pub fn current() -> io::Result<Self> {
        Ok(Self::new(current_executable()?))
    }

    /// Path being replaced
    pub fn target(&self) -> &Path {
        &self.target
    }

    fn directory(&self) -> io::Result<&Path> {
        self.target
            .parent()
            .ok_or_else(|| io::Error::other(format!("{:?} has no parent directory", self.target)))
    }

    fn file_name(&self) -> io::Result<String> {
        self.target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| io::Error::other(format!("{:?} has no file name", self.target)))
    }

    /// Path the old image is moved to during install
    pub fn backup_path(&self) -> io::Result<PathBuf> {
        Ok(self.directory()?.join(format!(".{}.old", self.file_name()?)))
    }

    fn write_staged(&self, new_binary: &[u8]) -> io::Result<tempfile::NamedTempFile> {
        let mut staged = tempfile::Builder::new()
            .prefix(&format!(".{}.", self.file_name()?))
            .suffix(".new")
            .tempfile_in(self.directory()?)?;

        staged.write_all(new_binary)?;
        staged.as_file().sync_all()?;

        let permissions = fs::metadata(&self.target)?.permissions();
        fs::set_permissions(staged.path(), permissions)?;

        Ok(staged)
    }
}

impl Installer for ExecutableInstaller {
    fn preflight(&self) -> io::Result<()> {
        let metadata = fs::metadata(&self.target)?;
        if !metadata.is_file() {
            return Err(io::Error::other(format!(
                "{:?} is not a regular file",
                self.target
            )));
        }

        // The directory must accept new files for the staged image
        tempfile::Builder::new()
            .prefix(".patchup-preflight.")
            .tempfile_in(self.directory()?)
            .map(drop)
    }

    fn install(&self, new_binary: &[u8]) -> Result<(), InstallFailure> {
        debug!(target = ?self.target, size = new_binary.len(), "Installing new executable");

        let staged = self.write_staged(new_binary).map_err(InstallFailure::Failed)?;
        let backup = self.backup_path().map_err(InstallFailure::Failed)?;

        // A leftover from an earlier install may still be there
        if backup.exists() {
            if let Err(e) = fs::remove_file(&backup) {
                warn!(backup = ?backup, error = %e, "Failed to remove stale backup");
            }
        }

        fs::rename(&self.target, &backup).map_err(InstallFailure::Failed)?;

        if let Err(persist_err) = staged.persist(&self.target) {
            let install = persist_err.error;
            error!(target = ?self.target, error = %install, "Failed to move new executable into place");

            return match fs::rename(&backup, &self.target) {
                Ok(()) => {
                    warn!(target = ?self.target, "Rolled back to previous executable");
                    Err(InstallFailure::Failed(install))
                }
                Err(recovery) => {
                    error!(
                        target = ?self.target,
                        backup = ?backup,
                        error = %recovery,
                        "Rollback failed, executable may be missing"
                    );
                    Err(InstallFailure::RecoveryFailed { install, recovery })
                }
            };
        }

        // Windows keeps the running image locked; the backup is removed next time
        if let Err(e) = fs::remove_file(&backup) {
            debug!(backup = ?backup, error = %e, "Leaving old executable behind");
        }

        info!(target = ?self.target, "Executable replaced successfully");
        Ok(())
    }
}
