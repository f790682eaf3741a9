//! Common test infrastructure for patchup tests
//!
//! # Usage
//!
//! In your test file, add:
//! ```ignore
//! mod common;
//! use common::*;
//! ```
//!
//! # Modules
//!
//! - `constants`: Versions, platform identifier, binary contents
//! - `builders`: Artifact builders (gzip, patches, metadata) and config helpers
//! - `mock_server`: Wiremock setup helpers for the update endpoints
//! - `updater_helpers`: Test installers and temporary executables

// Not every test binary uses every helper
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod builders;
pub mod constants;
pub mod mock_server;
pub mod updater_helpers;

pub use builders::*;
pub use constants::*;
pub use mock_server::*;
pub use updater_helpers::*;
