//! runtime-bump CLI
//!
//! ## Commands
//!
//! - `run`: update every configured repository and open pull requests
//! - `check`: validate the configuration without touching any repository
//! - `auth`: verify GitHub credentials

mod cli;

use anyhow::Context;
use clap::{Parser, Subcommand};
use cli::run::RunOptions;
use runtime_bump::plan::{ComponentFilter, RunFilter, RuntimeFilter};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "runtime-bump")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Propagate runtime versions into downstream repositories", long_about = None)]
struct Cli {
    /// Path to the configuration file (.toml, .yaml or .yml)
    #[arg(short, long, global = true, default_value = "runtime-bump.toml")]
    config: PathBuf,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Filter flags shared by `run` and `check`
#[derive(clap::Args, Debug, Clone)]
struct FilterArgs {
    /// Base branch to update (default: each repository's default branch)
    #[arg(short = 'b', long = "target-branch", env = "TARGET_BRANCH")]
    target_branch: Option<String>,

    /// Runtime to update, or "all"
    #[arg(short, long, env = "RUNTIME_FILTER", default_value = "all")]
    runtime: RuntimeFilter,

    /// Component family: vllm, odh-controller or both
    #[arg(long, default_value = "both")]
    component: ComponentFilter,
}

impl FilterArgs {
    fn into_filter(self) -> RunFilter {
        RunFilter {
            runtime: self.runtime,
            component: self.component,
            base_branch: self.target_branch.filter(|b| !b.trim().is_empty()),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Update repositories and open or refresh pull requests
    Run {
        #[command(flatten)]
        filter: FilterArgs,

        /// Show what would change without pushing or opening pull requests
        #[arg(long, env = "DRY_RUN")]
        dry_run: bool,

        /// Preview the plan and ask before executing
        #[arg(long)]
        confirm: bool,

        /// Print planned change sets as JSON (implies --dry-run)
        #[arg(long)]
        json: bool,

        /// GitHub token (default: GITHUB_TOKEN, GH_TOKEN, then `gh auth token`)
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Clone and push from <BASE>/<owner>/<name>.git instead of https://<host>
        #[arg(long, hide = true)]
        remote_base: Option<String>,

        /// Write a markdown summary to this file
        #[arg(long)]
        summary_file: Option<PathBuf>,

        /// Write the number of created/updated pull requests to this file
        #[arg(long)]
        pr_count_file: Option<PathBuf>,
    },

    /// Validate the configuration and show what a run would cover
    Check {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Check GitHub authentication
    Auth {
        /// GitHub host (default: github.com)
        #[arg(long)]
        host: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "runtime_bump=debug,info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            anstream::eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Commands::Run {
            filter,
            dry_run,
            confirm,
            json,
            token,
            remote_base,
            summary_file,
            pr_count_file,
        } => {
            let options = RunOptions {
                filter: filter.into_filter(),
                dry_run: dry_run || json,
                confirm,
                json,
                token: token.filter(|t| !t.is_empty()),
                remote_base,
                summary_file,
                pr_count_file,
                verbose: cli.verbose,
            };
            let report = cli::run::run_update(&cli.config, options)
                .await
                .with_context(|| format!("update run with {} failed", cli.config.display()))?;
            Ok(if report.is_failure() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Commands::Check { filter } => {
            cli::check::run_check(&cli.config, &filter.into_filter())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Auth { host } => {
            cli::auth::run_auth(host.as_deref()).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
