//! Pull request hosts
//!
//! Provides a unified interface for the PR operations the submitter needs,
//! and per-host dispatch for fleets spanning several hosts.

mod factory;
mod github;

pub use factory::HostSet;
pub use github::GitHubService;

use crate::error::Result;
use crate::types::{PullRequest, PullRequestSpec, RepoId};
use async_trait::async_trait;

/// Pull request host trait
///
/// This trait abstracts the hosting service, allowing the submitter and the
/// fork-aware gateway to run against GitHub or an in-memory mock.
#[async_trait]
pub trait PullRequestHost: Send + Sync {
    /// Most recent PR (any state) whose head is `head` (`owner:branch`)
    async fn find_pull_request(&self, repo: &RepoId, head: &str) -> Result<Option<PullRequest>>;

    /// Open a new PR
    async fn create_pull_request(&self, spec: &PullRequestSpec) -> Result<PullRequest>;

    /// Refresh title, body and base of an existing PR
    async fn update_pull_request(
        &self,
        repo: &RepoId,
        number: u64,
        spec: &PullRequestSpec,
    ) -> Result<PullRequest>;

    /// Fork `upstream` (idempotent on the host); returns the fork's id
    async fn create_fork(&self, upstream: &RepoId, organization: Option<&str>) -> Result<RepoId>;

    /// Login of the authenticated account on `host`
    async fn current_user(&self, host: &str) -> Result<String>;
}
