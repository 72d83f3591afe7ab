//! Change set execution - effectful operations
//!
//! This module takes change sets (created by the pure planner) and drives
//! each one to a terminal state through the gateway and the submitter.

use super::progress::ProgressCallback;
use super::retry::{RetryPolicy, with_retry};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::gateway::{GatewaySession, PushOutcome, RepositoryGateway, WorkingCopy};
use crate::plan::ChangeSet;
use crate::pr::{PrSubmitter, PullRequestOutcome, change_report, commit_message, pull_request_spec};
use crate::types::RepoId;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Semaphore, watch};
use tracing::{debug, info, warn};

/// Terminal state of one change set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSetOutcome {
    /// Nothing to change
    Skipped,
    /// Preview only; carries the rendered report
    DryRunReported(String),
    /// Branch pushed and pull request handled
    Applied(PullRequestOutcome),
    /// Drift, gateway or host failure
    Failed(String),
    /// Not started (or stopped after its push) because the run was cancelled
    Cancelled,
}

impl ChangeSetOutcome {
    /// Whether this outcome counts as a failure
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Pull request outcome, for applied change sets
    pub const fn pull_request(&self) -> Option<&PullRequestOutcome> {
        match self {
            Self::Applied(outcome) => Some(outcome),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeSetOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped => write!(f, "skipped (already up to date)"),
            Self::DryRunReported(_) => write!(f, "dry run"),
            Self::Applied(outcome) => write!(f, "{outcome}"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Outcome of one change set together with the change set itself
#[derive(Debug, Clone)]
pub struct RepoOutcome {
    /// The executed change set
    pub change_set: ChangeSet,
    /// Where it ended up
    pub outcome: ChangeSetOutcome,
}

impl RepoOutcome {
    /// Repository the outcome belongs to
    pub const fn repo(&self) -> &RepoId {
        &self.change_set.repo
    }
}

/// A planned change set, optionally with the working copy it was planned from
#[derive(Debug)]
pub struct PreparedChangeSet {
    /// What to change
    pub change_set: ChangeSet,
    /// Checkout at the base branch; cloned on demand when `None`
    pub copy: Option<WorkingCopy>,
}

impl From<ChangeSet> for PreparedChangeSet {
    fn from(change_set: ChangeSet) -> Self {
        Self {
            change_set,
            copy: None,
        }
    }
}

/// Execution knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionOptions {
    /// Report only; never mutate a repository or open a pull request
    pub dry_run: bool,
    /// Worker-pool size
    pub max_parallel: usize,
    /// Retry policy for transient gateway/host failures
    pub retry: RetryPolicy,
}

impl ExecutionOptions {
    /// Options from run settings
    pub fn from_settings(settings: &Settings, dry_run: bool) -> Self {
        Self {
            dry_run,
            max_parallel: settings.max_parallel.max(1),
            retry: RetryPolicy::from_settings(settings),
        }
    }
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default(), false)
    }
}

/// Drives change sets through the gateway and the submitter
#[derive(Clone)]
pub struct Executor {
    gateway: Arc<dyn RepositoryGateway>,
    submitter: Arc<PrSubmitter>,
    session: Arc<GatewaySession>,
    progress: Arc<dyn ProgressCallback>,
    options: ExecutionOptions,
    cancel: watch::Receiver<bool>,
}

impl Executor {
    /// Create an executor; it never observes a cancellation until
    /// [`with_cancellation`](Self::with_cancellation) is used
    pub fn new(
        gateway: Arc<dyn RepositoryGateway>,
        submitter: Arc<PrSubmitter>,
        session: Arc<GatewaySession>,
        progress: Arc<dyn ProgressCallback>,
        options: ExecutionOptions,
    ) -> Self {
        let (_tx, cancel) = watch::channel(false);
        Self {
            gateway,
            submitter,
            session,
            progress,
            options,
            cancel,
        }
    }

    /// Observe a cancellation flag; `true` stops new change sets from starting
    #[must_use]
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Execution options in effect
    pub const fn options(&self) -> &ExecutionOptions {
        &self.options
    }

    fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Execute every change set (EFFECTFUL)
    ///
    /// Change sets run concurrently, bounded by `max_parallel`. A failure is
    /// scoped to its own change set. Outcomes are returned in input order.
    pub async fn execute(&self, items: Vec<PreparedChangeSet>) -> Vec<RepoOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.options.max_parallel.max(1)));
        let mut tasks = Vec::with_capacity(items.len());

        for item in items {
            let worker = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let change_set = item.change_set.clone();
            let task = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                worker.run_one(item).await
            });
            tasks.push((change_set, task));
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        for (change_set, task) in tasks {
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(repo = %change_set.repo, error = %e, "worker aborted");
                    ChangeSetOutcome::Failed(format!("worker aborted: {e}"))
                }
            };
            outcomes.push(RepoOutcome {
                change_set,
                outcome,
            });
        }
        outcomes
    }

    /// Drive one change set to a terminal state
    async fn run_one(&self, item: PreparedChangeSet) -> ChangeSetOutcome {
        let PreparedChangeSet { change_set, copy } = item;
        let repo = change_set.repo.clone();

        let outcome = if self.is_cancelled() {
            ChangeSetOutcome::Cancelled
        } else if change_set.has_drift() {
            let reasons: Vec<String> = change_set
                .drift_errors()
                .iter()
                .map(ToString::to_string)
                .collect();
            ChangeSetOutcome::Failed(reasons.join("; "))
        } else if change_set.is_empty() {
            ChangeSetOutcome::Skipped
        } else if self.options.dry_run {
            ChangeSetOutcome::DryRunReported(change_report(&change_set))
        } else {
            match self.apply(&change_set, copy).await {
                Ok(pr) => ChangeSetOutcome::Applied(pr),
                Err(Error::Cancelled) => ChangeSetOutcome::Cancelled,
                Err(e) => ChangeSetOutcome::Failed(e.to_string()),
            }
        };

        match &outcome {
            ChangeSetOutcome::Failed(reason) => warn!(%repo, reason, "change set failed"),
            other => info!(%repo, outcome = %other, "change set finished"),
        }
        self.progress.on_outcome(&repo, &outcome).await;
        outcome
    }

    /// Fork, branch, write, commit, push, then open or refresh the PR
    async fn apply(
        &self,
        change_set: &ChangeSet,
        copy: Option<WorkingCopy>,
    ) -> Result<PullRequestOutcome> {
        let repo = &change_set.repo;
        let retry = self.options.retry;

        self.progress
            .on_message(&format!(
                "🔧 Applying {} change(s) to {repo}",
                change_set.records.len()
            ))
            .await;

        let copy = match copy {
            Some(copy) => copy,
            None => {
                with_retry(retry, "checkout", || {
                    self.gateway
                        .checkout(&self.session, repo, &change_set.base_branch)
                })
                .await?
            }
        };

        let target = with_retry(retry, "fork", || {
            self.gateway.ensure_fork(&self.session, repo)
        })
        .await?;

        self.gateway
            .prepare_branch(&copy, &change_set.head_branch)
            .await?;
        self.gateway.write_files(&copy, &change_set.files).await?;
        let sha = self
            .gateway
            .commit(&copy, &change_set.files, &commit_message(change_set))
            .await?;
        debug!(%repo, %sha, "change set committed");

        let pushed = with_retry(retry, "push", || {
            self.gateway.push(&copy, &target, &change_set.head_branch)
        })
        .await?;
        drop(copy);

        if pushed == PushOutcome::Pushed {
            self.progress
                .on_message(&format!("⬆️  Pushed {} to {target}", change_set.head_branch))
                .await;
        }

        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let spec = pull_request_spec(change_set, &target.owner);
        let outcome = with_retry(retry, "pull request", || {
            self.submitter
                .submit(&spec, pushed == PushOutcome::Pushed)
        })
        .await?;

        self.progress
            .on_message(&format!(
                "✅ {repo}: {outcome} {}",
                outcome.pull_request().html_url
            ))
            .await;
        Ok(outcome)
    }
}
