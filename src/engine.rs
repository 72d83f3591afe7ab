//! Update run orchestration
//!
//! Three-phase pattern:
//! 1. Gather - check out every selected repository (effectful, read-only)
//! 2. Plan - compute change sets from the checkouts (pure)
//! 3. Execute - apply change sets and submit pull requests (effectful)

use crate::config::ConfigModel;
use crate::error::Result;
use crate::exec::{
    ChangeSetOutcome, ExecutionOptions, Executor, NoopProgress, PreparedChangeSet,
    ProgressCallback, RepoOutcome, with_retry,
};
use crate::gateway::{GatewaySession, RepositoryGateway, WorkingCopy};
use crate::plan::{ChangeSet, RunFilter, plan_repository, select_repositories};
use crate::platform::PullRequestHost;
use crate::pr::PrSubmitter;
use crate::report::RunReport;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{Semaphore, watch};
use tracing::{info, warn};

/// Wires the gateway and the PR host into complete update runs
pub struct Engine {
    gateway: Arc<dyn RepositoryGateway>,
    host: Arc<dyn PullRequestHost>,
    progress: Arc<dyn ProgressCallback>,
    cancel: watch::Receiver<bool>,
}

impl Engine {
    /// Create an engine with no progress reporting and no cancellation
    pub fn new(gateway: Arc<dyn RepositoryGateway>, host: Arc<dyn PullRequestHost>) -> Self {
        let (_tx, cancel) = watch::channel(false);
        Self {
            gateway,
            host,
            progress: Arc::new(NoopProgress),
            cancel,
        }
    }

    /// Report progress to `progress`
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Observe a cancellation flag
    #[must_use]
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run one update over every repository selected by `filter`.
    ///
    /// Configuration errors (including a filter naming an undeclared
    /// runtime, or a rule bound to one) abort the run before anything is
    /// mutated. Everything else is recorded per repository in the report.
    pub async fn run(
        &self,
        config: &ConfigModel,
        filter: &RunFilter,
        dry_run: bool,
    ) -> Result<RunReport> {
        let started_at = Utc::now();
        filter.validate(config)?;

        let session = Arc::new(GatewaySession::new()?);
        let options = ExecutionOptions::from_settings(&config.settings, dry_run);
        let targets = select_repositories(config, filter);
        info!(
            repositories = targets.len(),
            runtime = %filter.runtime,
            component = %filter.component,
            dry_run,
            "starting update run"
        );

        // Phase 1: GATHER
        self.progress
            .on_message(&format!("📥 Checking out {} repositories", targets.len()))
            .await;
        let checkouts = self.gather(config, filter, &session, options).await;

        // Phase 2: PLAN
        let mut slots: Vec<Option<RepoOutcome>> = Vec::with_capacity(targets.len());
        let mut prepared = Vec::new();
        let mut prepared_slots = Vec::new();
        for (target, checkout) in targets.iter().zip(checkouts) {
            match checkout {
                Ok(copy) => {
                    let Some(change_set) = plan_repository(config, target, filter, &copy)? else {
                        continue;
                    };
                    prepared_slots.push(slots.len());
                    slots.push(None);
                    prepared.push(PreparedChangeSet {
                        change_set,
                        copy: Some(copy),
                    });
                }
                Err(outcome) => {
                    let change_set = ChangeSet::new(&config.settings, target, filter);
                    self.progress.on_outcome(&change_set.repo, &outcome).await;
                    slots.push(Some(RepoOutcome {
                        change_set,
                        outcome,
                    }));
                }
            }
        }

        // Phase 3: EXECUTE
        let executor = Executor::new(
            Arc::clone(&self.gateway),
            Arc::new(PrSubmitter::new(Arc::clone(&self.host))),
            session,
            Arc::clone(&self.progress),
            options,
        )
        .with_cancellation(self.cancel.clone());

        for (slot, outcome) in prepared_slots.into_iter().zip(executor.execute(prepared).await) {
            slots[slot] = Some(outcome);
        }

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            target_branch: filter.base_branch.clone(),
            runtime_filter: filter.runtime.clone(),
            component_filter: filter.component,
            dry_run,
            outcomes: slots.into_iter().flatten().collect(),
        };
        let counts = report.counts();
        info!(
            created = counts.created,
            updated = counts.updated,
            skipped = counts.skipped,
            failed = counts.failed,
            "update run finished"
        );
        Ok(report)
    }

    /// Check out every selected repository, bounded by `max_parallel`.
    ///
    /// Results are in selection order; a failed or cancelled checkout
    /// yields the outcome to record for that repository.
    async fn gather(
        &self,
        config: &ConfigModel,
        filter: &RunFilter,
        session: &Arc<GatewaySession>,
        options: ExecutionOptions,
    ) -> Vec<std::result::Result<WorkingCopy, ChangeSetOutcome>> {
        let semaphore = Arc::new(Semaphore::new(options.max_parallel));
        let mut tasks = Vec::new();

        for target in select_repositories(config, filter) {
            let gateway = Arc::clone(&self.gateway);
            let session = Arc::clone(session);
            let semaphore = Arc::clone(&semaphore);
            let cancel = self.cancel.clone();
            let repo = target.repo.clone();
            let base_branch = filter.base_branch_for(target).to_string();

            tasks.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                if *cancel.borrow() {
                    return Err(ChangeSetOutcome::Cancelled);
                }
                with_retry(options.retry, "checkout", || {
                    gateway.checkout(&session, &repo, &base_branch)
                })
                .await
                .map_err(|e| {
                    warn!(%repo, error = %e, "checkout failed");
                    ChangeSetOutcome::Failed(e.to_string())
                })
            }));
        }

        let mut results = Vec::with_capacity(tasks.len());
        for task in tasks {
            results.push(match task.await {
                Ok(result) => result,
                Err(e) => Err(ChangeSetOutcome::Failed(format!("worker aborted: {e}"))),
            });
        }
        results
    }
}
