//! Binary diff application

use std::io;
use thiserror::Error;

/// Patch application failure
#[derive(Error, Debug)]
pub enum PatchError {
    /// The patch blob is not a valid patch
    #[error("corrupt patch: {0}")]
    Corrupt(#[source] std::io::Error),

    /// The patch does not apply to the given base binary
    #[error("patch does not apply to base binary: {0}")]
    Apply(#[source] std::io::Error),
}

/// Diff/patch capability
///
/// Applying a patch is CPU-bound and not interruptible; the updater runs it
/// on a blocking worker.
pub trait Patcher: Send + Sync {
    /// Reconstruct the target binary from `old` and `patch`
    fn patch(&self, old: &[u8], patch: &[u8]) -> Result<Vec<u8>, PatchError>;
}

/// Applies BSDIFF40 patches (bsdiff 4.x / binarydist format)
#[derive(Debug, Clone, Copy, Default)]
pub struct BsdiffPatcher;

impl Patcher for BsdiffPatcher {
    fn patch(&self, old: &[u8], patch: &[u8]) -> Result<Vec<u8>, PatchError> {
        let patcher = qbsdiff::Bspatch::new(patch).map_err(PatchError::Corrupt)?;
        let declared = patcher.hint_target_size();

        // The header size is untrusted; never reserve more than the inputs could plausibly yield
        let plausible = (old.len() as u64)
            .saturating_mul(4)
            .saturating_add(patch.len() as u64);
        let mut target = Vec::with_capacity(declared.min(plausible) as usize);
        patcher.apply(old, &mut target).map_err(PatchError::Apply)?;

        if target.len() as u64 != declared {
            return Err(PatchError::Apply(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "patch produced {} bytes but declares {}",
                    target.len(),
                    declared
                ),
            )));
        }

        Ok(target)
    }
}
