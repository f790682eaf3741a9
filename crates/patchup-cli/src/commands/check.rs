//! Check command

use anyhow::{Context, Result};
use camino::Utf8Path;
use patchup::{HttpFetcher, UpdateOutcome, Updater};
use std::sync::Arc;

use crate::cli::CheckArgs;
use crate::output;

pub async fn run(args: CheckArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let settings = super::load_settings(config_path)?;
    let mut config = super::build_config(&settings, &args.target)?;
    if args.force {
        config = config.with_force_check(true);
    }

    let fetcher = HttpFetcher::with_options(settings.http_timeout(), &settings.user_agent)
        .context("Failed to create HTTP client")?;

    let updater = Updater::builder(config)
        .fetcher(Arc::new(fetcher))
        .build()?;

    match updater.run().await? {
        UpdateOutcome::Disabled => {
            output::warning("No update URLs configured (set api-url and bin-url)");
        }
        UpdateOutcome::Skipped => {
            output::info("Update check not due yet (use --force to check anyway)");
        }
        UpdateOutcome::UpToDate { version } => {
            output::success(&format!("Already at latest version {}", version));
        }
        UpdateOutcome::Updated { from, to, strategy } => {
            output::success(&format!("Updated {} -> {} via {}", from, to, strategy));
        }
    }

    Ok(())
}
