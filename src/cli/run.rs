//! Run command - propagate runtime versions and open pull requests

use crate::cli::CliProgress;
use crate::cli::context::CommandContext;
use crate::cli::style::{CHECK, Stylize, check, spinner_style};
use anstream::println;
use dialoguer::Confirm;
use indicatif::ProgressBar;
use runtime_bump::engine::Engine;
use runtime_bump::error::{Error, Result};
use runtime_bump::exec::ChangeSetOutcome;
use runtime_bump::plan::{ChangeSet, RunFilter};
use runtime_bump::report::RunReport;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::warn;

/// Options for the run command
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Which repositories and rules to cover
    pub filter: RunFilter,
    /// Dry run - show what would be done without making changes
    pub dry_run: bool,
    /// Preview plan and prompt for confirmation before executing
    pub confirm: bool,
    /// Print planned change sets as JSON instead of the summary
    pub json: bool,
    /// GitHub token (discovered when `None`)
    pub token: Option<String>,
    /// Clone/push from `<base>/<owner>/<name>.git`
    pub remote_base: Option<String>,
    /// Write the markdown summary here
    pub summary_file: Option<PathBuf>,
    /// Write the created/updated PR count here
    pub pr_count_file: Option<PathBuf>,
    /// Print every progress message
    pub verbose: bool,
}

/// Run the run command
#[allow(clippy::future_not_send)]
pub async fn run_update(config_path: &Path, options: RunOptions) -> Result<RunReport> {
    let ctx = CommandContext::load(config_path)?;
    options.filter.validate(&ctx.config)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(spinner_style());
    spinner.set_message("Resolving credentials...");
    spinner.enable_steady_tick(Duration::from_millis(80));
    let connections = ctx
        .connect(
            options.token.clone(),
            options.remote_base.as_deref(),
            options.dry_run,
        )
        .await?;
    spinner.finish_and_clear();

    let progress: Arc<CliProgress> = Arc::new(if options.verbose {
        CliProgress::verbose()
    } else {
        CliProgress::compact()
    });

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing in-flight repositories");
            let _ = cancel_tx.send(true);
        }
    });

    let engine = Engine::new(connections.gateway, connections.host)
        .with_progress(progress)
        .with_cancellation(cancel_rx);

    // Show confirmation if requested
    if options.confirm && !options.dry_run {
        println!("{}:", "Update plan".emphasis());
        let preview = engine.run(&ctx.config, &options.filter, true).await?;
        println!();
        if !preview.outcomes.iter().any(|o| {
            matches!(o.outcome, ChangeSetOutcome::DryRunReported(_))
        }) {
            println!("{}", "Nothing to update".muted());
            return Ok(preview);
        }
        if !Confirm::new()
            .with_prompt("Proceed with update?")
            .default(true)
            .interact()
            .map_err(|e| Error::Internal(format!("Failed to read confirmation: {e}")))?
        {
            println!("{}", "Aborted".muted());
            return Ok(preview);
        }
        println!();
    }

    println!(
        "{} {} repositories ({})",
        if options.dry_run {
            "Previewing".emphasis()
        } else {
            "Updating".emphasis()
        },
        ctx.config
            .repositories
            .iter()
            .filter(|r| options.filter.selects_repository(r))
            .count()
            .accent(),
        ctx.config_path.display().muted()
    );

    let report = engine.run(&ctx.config, &options.filter, options.dry_run).await?;

    if options.json {
        let planned: Vec<&ChangeSet> = report.outcomes.iter().map(|o| &o.change_set).collect();
        let json = serde_json::to_string_pretty(&planned)
            .map_err(|e| Error::Internal(format!("Failed to serialize plan: {e}")))?;
        println!("{json}");
    } else {
        print_summary(&report);
    }

    if let Some(path) = &options.summary_file {
        report.write_summary(path)?;
    }
    if let Some(path) = &options.pr_count_file {
        report.write_pr_count(path)?;
    }

    Ok(report)
}

/// Print run summary
fn print_summary(report: &RunReport) {
    let counts = report.counts();
    println!();
    if report.dry_run {
        println!(
            "{} {} to update, {} up to date, {} failed",
            "Dry run complete:".muted(),
            counts.dry_run.accent(),
            counts.skipped.accent(),
            counts.failed.accent()
        );
        println!("{}", "Run without --dry-run to execute.".muted());
    } else if counts.failed == 0 && counts.cancelled == 0 {
        println!(
            "{} {} created, {} updated, {} unchanged, {} up to date",
            format!("{CHECK} Update complete:").success(),
            counts.created.accent(),
            counts.updated.accent(),
            counts.up_to_date.accent(),
            counts.skipped.accent()
        );
    } else {
        println!(
            "{} {} created, {} updated, {} failed, {} cancelled",
            "⚠️  Update partially complete:".warn(),
            counts.created.accent(),
            counts.updated.accent(),
            counts.failed.accent(),
            counts.cancelled.accent()
        );
    }

    if report.is_failure() {
        println!("{}", "Every repository failed.".warn());
    } else if counts.failed == 0 && !report.dry_run && report.pr_count() > 0 {
        println!("{} {} pull request(s) ready for review", check(), report.pr_count());
    }
}
