//! Digest command
//!
//! Prints what a publisher needs to announce a binary: its SHA-256 as hex and
//! as base64, and optionally the complete metadata document.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use patchup::RemoteVersionInfo;

use crate::cli::DigestArgs;
use crate::output;

pub fn run(args: DigestArgs) -> Result<()> {
    let bytes = std::fs::read(&args.file).with_context(|| format!("Failed to read {}", args.file))?;
    let report = DigestReport::new(&bytes);

    output::kv("File", args.file.as_str());
    output::kv("Size", &bytes.len().to_string());
    output::kv("SHA-256", &report.hex);
    output::kv("Base64", &report.base64);

    if let Some(version) = args.publish_version {
        println!("{}", RemoteVersionInfo::for_binary(version, &bytes).to_json());
    }

    Ok(())
}

struct DigestReport {
    hex: String,
    base64: String,
}

impl DigestReport {
    fn new(bytes: &[u8]) -> Self {
        let digest = patchup::digest(bytes);
        Self {
            hex: hex::encode(digest),
            base64: BASE64.encode(digest),
        }
    }
}
