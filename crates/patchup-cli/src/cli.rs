//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// patchup - Throttled, verified self-updates
#[derive(Parser, Debug)]
#[command(name = "patchup")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the updater settings file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one update cycle
    Check(CheckArgs),

    /// Show the check schedule
    Status(StatusArgs),

    /// Print the platform identifier used in update URLs
    Platform,

    /// Print the SHA-256 digest of a file
    Digest(DigestArgs),
}

/// Executable an update cycle is run for
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Executable to update (defaults to this binary)
    #[arg(long)]
    pub executable: Option<Utf8PathBuf>,

    /// Command name used in update URLs
    #[arg(long)]
    pub cmd_name: Option<String>,

    /// Version the executable is currently at
    #[arg(long)]
    pub current_version: Option<String>,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Check even if the next check is not due yet
    #[arg(long)]
    pub force: bool,

    #[command(flatten)]
    pub target: TargetArgs,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub target: TargetArgs,
}

#[derive(Args, Debug)]
pub struct DigestArgs {
    /// File to hash
    pub file: Utf8PathBuf,

    /// Also print the metadata document publishing this file as VERSION
    #[arg(long, value_name = "VERSION")]
    pub publish_version: Option<String>,
}
