//! Status command

use anyhow::{Context, Result};
use camino::Utf8Path;
use chrono::Utc;
use patchup::install::current_executable;
use patchup::{CheckScheduler, TokenState, DEV_VERSION};

use crate::cli::StatusArgs;
use crate::output;

pub fn run(args: StatusArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let settings = super::load_settings(config_path)?;
    let config = super::build_config(&settings, &args.target)?;

    let executable = match config.executable_path() {
        Some(path) => path.to_path_buf(),
        None => current_executable().context("Couldn't get path to self executable")?,
    };
    let scheduler = CheckScheduler::new(config.resolve_state_dir(&executable));
    let token = scheduler.next_check();
    let now = Utc::now();

    let next_check = match &token {
        TokenState::Scheduled(next) => Some(next.to_rfc3339()),
        _ => None,
    };
    let token_error = match &token {
        TokenState::Invalid(reason) => Some(reason.clone()),
        _ => None,
    };
    let due = config.current_version() != DEV_VERSION && token.is_due(now);

    if args.json {
        let status = serde_json::json!({
            "cmd_name": config.cmd_name(),
            "current_version": config.current_version(),
            "platform": patchup::platform(),
            "enabled": config.is_enabled(),
            "executable": executable,
            "token_path": scheduler.token_path(),
            "next_check": next_check,
            "token_error": token_error,
            "due": due,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    output::header(&format!("Update status: {}", config.cmd_name()));
    output::kv("Version", config.current_version());
    output::kv("Platform", &patchup::platform());
    output::kv("Enabled", &config.is_enabled().to_string());
    output::kv("Executable", &executable.display().to_string());
    output::kv("Token", &scheduler.token_path().display().to_string());

    match token {
        TokenState::Missing => output::kv("Next check", "on next run (never checked)"),
        TokenState::Invalid(_) => output::kv("Next check", "on next run (token unreadable)"),
        TokenState::Scheduled(next) => output::kv("Next check", &next.to_rfc3339()),
    }
    output::kv("Due", &due.to_string());

    if let Some(reason) = token_error {
        output::warning(&format!("Check token ignored: {}", reason));
    }
    if config.current_version() == DEV_VERSION {
        output::info("Development build, update checks are disabled");
    }

    Ok(())
}
