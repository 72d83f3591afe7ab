//! Progress reporting during execution

use super::ChangeSetOutcome;
use crate::types::RepoId;
use async_trait::async_trait;

/// Receives status updates while change sets are executed.
///
/// Callbacks may arrive from several workers at once.
#[async_trait]
pub trait ProgressCallback: Send + Sync {
    /// A free-form status line
    async fn on_message(&self, message: &str);

    /// A change set reached its terminal state
    async fn on_outcome(&self, repo: &RepoId, outcome: &ChangeSetOutcome);
}

/// Progress callback that ignores everything
pub struct NoopProgress;

#[async_trait]
impl ProgressCallback for NoopProgress {
    async fn on_message(&self, _message: &str) {}

    async fn on_outcome(&self, _repo: &RepoId, _outcome: &ChangeSetOutcome) {}
}
