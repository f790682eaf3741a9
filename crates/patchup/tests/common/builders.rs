//! Builders for update artifacts and configurations

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use flate2::write::GzEncoder;
use flate2::Compression;
use patchup::UpdateConfig;
use std::io::Write;
use std::path::Path;

use super::constants::*;

/// Gzip-compress a binary the way the full-binary endpoint serves it
pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}

/// Build a bsdiff patch turning `old` into `new`
pub fn make_patch(old: &[u8], new: &[u8]) -> Vec<u8> {
    let mut patch = Vec::new();
    qbsdiff::Bsdiff::new(old, new).compare(&mut patch).unwrap();
    patch
}

/// Gzip `bytes` as two concatenated members, split in the middle
pub fn gzip_two_members(bytes: &[u8]) -> Vec<u8> {
    let (first, second) = bytes.split_at(bytes.len() / 2);
    let mut gz = gzip(first);
    gz.extend(gzip(second));
    gz
}

/// Patch with a valid header declaring `declared_size` target bytes and no blocks
pub fn header_only_patch(declared_size: u64) -> Vec<u8> {
    let mut patch = b"BSDIFF40".to_vec();
    patch.extend_from_slice(&0u64.to_le_bytes());
    patch.extend_from_slice(&0u64.to_le_bytes());
    patch.extend_from_slice(&declared_size.to_le_bytes());
    patch
}

/// Metadata document body
pub fn metadata_json(version: &str, digest: &[u8]) -> String {
    format!(
        r#"{{"Version":"{}","Sha256":"{}"}}"#,
        version,
        BASE64.encode(digest)
    )
}

/// Fluent builder for test configurations pointing at one server
pub struct ConfigBuilder {
    base_url: String,
    version: String,
    diff: bool,
    force: bool,
}

impl ConfigBuilder {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            version: VERSION_1_0_0.to_string(),
            diff: true,
            force: false,
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn without_diff(mut self) -> Self {
        self.diff = false;
        self
    }

    pub fn force(mut self) -> Self {
        self.force = true;
        self
    }

    pub fn build(self, executable: &Path, state_dir: &Path) -> UpdateConfig {
        let mut builder = UpdateConfig::builder(CMD_NAME, self.version)
            .api_url(self.base_url.clone())
            .bin_url(self.base_url.clone())
            .state_dir(state_dir)
            .executable_path(executable)
            .force_check(self.force);

        if self.diff {
            builder = builder.diff_url(self.base_url);
        }

        builder.build().expect("test config should be valid")
    }
}
