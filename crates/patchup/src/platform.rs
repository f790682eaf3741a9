//! Platform identifier used to select artifact variants
//!
//! Artifacts are published per `<os>-<arch>` pair using Go-style names
//! (`linux-amd64`, `darwin-arm64`, `windows-386`), so Rust's target names
//! are translated before use.

use std::env::consts;

/// Platform identifier of the running build
pub fn platform() -> String {
    platform_for(consts::OS, consts::ARCH)
}

/// Platform identifier for an OS/architecture pair as reported by `std::env::consts`
pub fn platform_for(os: &str, arch: &str) -> String {
    format!("{}-{}", os_name(os), arch_name(arch))
}

fn os_name(os: &str) -> String {
    match os {
        "macos" => "darwin".to_string(),
        other => other.to_lowercase(),
    }
}

fn arch_name(arch: &str) -> String {
    match arch {
        "x86_64" => "amd64".to_string(),
        "x86" => "386".to_string(),
        "aarch64" => "arm64".to_string(),
        "powerpc64" => "ppc64".to_string(),
        "loongarch64" => "loong64".to_string(),
        other => other.to_lowercase(),
    }
}
