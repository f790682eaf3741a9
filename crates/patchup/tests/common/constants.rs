//! Shared constants for test infrastructure

// Version constants
pub const VERSION_1_0_0: &str = "1.0.0";
pub const VERSION_1_1_0: &str = "1.1.0";

// Command and platform used by every mocked endpoint
pub const CMD_NAME: &str = "myapp";
pub const TEST_PLATFORM: &str = "linux-amd64";

// Digest that no test binary hashes to
pub const ZERO_DIGEST: [u8; 32] = [0u8; 32];

/// Content of the "running" executable
pub fn original_binary() -> Vec<u8> {
    b"\x7fELF original executable 1.0.0 -- text section -- data section --\n".repeat(64)
}

/// Content of the published 1.1.0 executable
pub fn new_binary() -> Vec<u8> {
    b"\x7fELF original executable 1.1.0 -- text section -- data section!!\n".repeat(64)
}

/// Content that matches no published digest
pub fn corrupted_binary() -> Vec<u8> {
    b"corrupted".repeat(64)
}
