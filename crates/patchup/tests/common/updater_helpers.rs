//! Helpers for updater testing
//!
//! Provides temporary executables and installers that record or fail
//! instead of touching a real binary.

use patchup::{InstallFailure, Installer, UpdateConfig, Updater};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use super::constants::*;

/// Temporary directory holding a fake executable and a state directory
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub executable: PathBuf,
    pub state_dir: PathBuf,
}

impl TestEnv {
    /// Environment whose executable holds `original_binary()`
    pub fn new() -> Self {
        Self::with_content(&original_binary())
    }

    pub fn with_content(content: &[u8]) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let executable = temp_dir.path().join(CMD_NAME);
        create_fake_binary(&executable, content).unwrap();
        let state_dir = temp_dir.path().join("update");

        Self {
            temp_dir,
            executable,
            state_dir,
        }
    }

    pub fn token_path(&self) -> PathBuf {
        self.state_dir.join(patchup::CHECK_TOKEN_FILE)
    }
}

/// Create a fake binary file with the given content
pub fn create_fake_binary(path: &Path, content: &[u8]) -> io::Result<()> {
    fs::write(path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms)?;
    }

    Ok(())
}

/// Installer that records what it was asked to install
#[derive(Default)]
pub struct RecordingInstaller {
    installed: Mutex<Vec<Vec<u8>>>,
}

impl RecordingInstaller {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn installs(&self) -> Vec<Vec<u8>> {
        self.installed.lock().unwrap().clone()
    }

    pub fn install_count(&self) -> usize {
        self.installed.lock().unwrap().len()
    }
}

impl Installer for RecordingInstaller {
    fn install(&self, new_binary: &[u8]) -> Result<(), InstallFailure> {
        self.installed.lock().unwrap().push(new_binary.to_vec());
        Ok(())
    }
}

/// Installer that always fails, optionally failing its rollback too
pub struct FailingInstaller {
    pub recovery_fails: bool,
}

impl Installer for FailingInstaller {
    fn install(&self, _new_binary: &[u8]) -> Result<(), InstallFailure> {
        let install = io::Error::new(io::ErrorKind::PermissionDenied, "rename denied");
        if self.recovery_fails {
            Err(InstallFailure::RecoveryFailed {
                install,
                recovery: io::Error::other("restore denied"),
            })
        } else {
            Err(InstallFailure::Failed(install))
        }
    }
}

/// Installer whose preflight refuses
pub struct ReadOnlyInstaller;

impl Installer for ReadOnlyInstaller {
    fn preflight(&self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
    }

    fn install(&self, _new_binary: &[u8]) -> Result<(), InstallFailure> {
        panic!("install must not be called after a failed preflight");
    }
}

/// Updater for `config` on the test platform with the given installer
pub fn test_updater(config: UpdateConfig, installer: Arc<dyn Installer>) -> Updater {
    Updater::builder(config)
        .platform(TEST_PLATFORM)
        .installer(installer)
        .build()
        .expect("updater should build")
}
