//! CLI commands

pub mod auth;
pub mod check;
pub mod context;
pub mod run;
pub mod style;

use anstream::println;
use async_trait::async_trait;
use runtime_bump::exec::{ChangeSetOutcome, ProgressCallback};
use runtime_bump::pr::PullRequestOutcome;
use runtime_bump::types::RepoId;
use style::{Stylize, check, cross, hyperlink};

/// Progress callback that prints to the terminal
pub struct CliProgress {
    verbose: bool,
}

impl CliProgress {
    /// Only print outcomes
    pub const fn compact() -> Self {
        Self { verbose: false }
    }

    /// Print every status message as well
    pub const fn verbose() -> Self {
        Self { verbose: true }
    }
}

#[async_trait]
impl ProgressCallback for CliProgress {
    async fn on_message(&self, message: &str) {
        if self.verbose {
            println!("{}", message.muted());
        }
    }

    async fn on_outcome(&self, repo: &RepoId, outcome: &ChangeSetOutcome) {
        let name = repo.slug();
        match outcome {
            ChangeSetOutcome::Skipped => {
                println!("  {} {} {}", "-".muted(), name.accent(), "up to date".muted());
            }
            ChangeSetOutcome::DryRunReported(report) => {
                println!("  {} {}", "?".warn(), name.accent());
                for line in report.lines().skip(1) {
                    println!("    {}", line.trim_start());
                }
            }
            ChangeSetOutcome::Applied(pr) => {
                let verb = match pr {
                    PullRequestOutcome::Created(_) => "created",
                    PullRequestOutcome::Updated(_) => "updated",
                    PullRequestOutcome::AlreadyUpToDate(_) => "unchanged",
                };
                let pr = pr.pull_request();
                println!(
                    "  {} {} PR #{} {} {}",
                    check(),
                    name.accent(),
                    pr.number,
                    verb,
                    hyperlink(&pr.html_url, &pr.html_url).muted()
                );
            }
            ChangeSetOutcome::Failed(reason) => {
                println!("  {} {} {}", cross(), name.accent(), reason.warn());
            }
            ChangeSetOutcome::Cancelled => {
                println!("  {} {} {}", "⏹".muted(), name.accent(), "cancelled".muted());
            }
        }
    }
}
