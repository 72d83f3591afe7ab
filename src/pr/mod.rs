//! Pull request submission
//!
//! Opens one pull request per change set, or refreshes the one a previous
//! run opened for the same head branch.

mod render;

pub use render::{
    BODY_MARKER, change_report, commit_message, pr_body, pr_title, pull_request_spec,
};

use crate::error::{Error, Result};
use crate::platform::PullRequestHost;
use crate::types::{PrState, PullRequest, PullRequestSpec};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// What happened to the pull request for a change set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullRequestOutcome {
    /// A new pull request was opened
    Created(PullRequest),
    /// An existing pull request was refreshed
    Updated(PullRequest),
    /// The existing pull request already matched
    AlreadyUpToDate(PullRequest),
}

impl PullRequestOutcome {
    /// The pull request involved
    pub const fn pull_request(&self) -> &PullRequest {
        match self {
            Self::Created(pr) | Self::Updated(pr) | Self::AlreadyUpToDate(pr) => pr,
        }
    }

    /// Whether the run created or modified the pull request
    pub const fn is_change(&self) -> bool {
        matches!(self, Self::Created(_) | Self::Updated(_))
    }
}

impl fmt::Display for PullRequestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created(pr) => write!(f, "created PR #{}", pr.number),
            Self::Updated(pr) => write!(f, "updated PR #{}", pr.number),
            Self::AlreadyUpToDate(pr) => write!(f, "PR #{} already up to date", pr.number),
        }
    }
}

/// Opens or refreshes pull requests through a [`PullRequestHost`]
pub struct PrSubmitter {
    host: Arc<dyn PullRequestHost>,
    logins: Mutex<HashMap<String, String>>,
}

impl PrSubmitter {
    /// Create a submitter backed by `host`
    pub fn new(host: Arc<dyn PullRequestHost>) -> Self {
        Self {
            host,
            logins: Mutex::new(HashMap::new()),
        }
    }

    /// Login the automation runs as on `host` (fetched once per host)
    async fn login(&self, host: &str) -> Result<String> {
        let cached = self
            .logins
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(host)
            .cloned();
        if let Some(login) = cached {
            return Ok(login);
        }

        let login = self.host.current_user(host).await?;
        self.logins
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(host.to_string(), login.clone());
        Ok(login)
    }

    /// Open or refresh the pull request for `spec`.
    ///
    /// `branch_changed` is false when the push found the remote head branch
    /// already carrying identical content.
    pub async fn submit(
        &self,
        spec: &PullRequestSpec,
        branch_changed: bool,
    ) -> Result<PullRequestOutcome> {
        let head = spec.head_ref();
        let existing = self.host.find_pull_request(&spec.repo, &head).await?;

        let Some(pr) = existing else {
            let pr = self.host.create_pull_request(spec).await?;
            debug!(repo = %spec.repo, pr_number = pr.number, "opened PR");
            return Ok(PullRequestOutcome::Created(pr));
        };

        match pr.state {
            PrState::Merged => {
                debug!(repo = %spec.repo, merged = pr.number, "previous PR merged, opening a new one");
                let pr = self.host.create_pull_request(spec).await?;
                Ok(PullRequestOutcome::Created(pr))
            }
            PrState::Closed => Err(Error::PrConflict {
                repo: spec.repo.to_string(),
                reason: format!(
                    "PR #{} for {head} was closed without merging; reopen or delete the branch",
                    pr.number
                ),
            }),
            PrState::Open => {
                let login = self.login(&spec.repo.host).await?;
                if let Some(author) = &pr.author
                    && author != &login
                {
                    return Err(Error::PrConflict {
                        repo: spec.repo.to_string(),
                        reason: format!(
                            "PR #{} for {head} is owned by {author}, not {login}",
                            pr.number
                        ),
                    });
                }

                let matches = pr.title == spec.title
                    && pr.body.as_deref() == Some(spec.body.as_str())
                    && pr.base_ref == spec.target_branch;
                if matches && !branch_changed {
                    debug!(repo = %spec.repo, pr_number = pr.number, "PR already up to date");
                    return Ok(PullRequestOutcome::AlreadyUpToDate(pr));
                }

                let updated = self
                    .host
                    .update_pull_request(&spec.repo, pr.number, spec)
                    .await?;
                debug!(repo = %spec.repo, pr_number = updated.number, "refreshed PR");
                Ok(PullRequestOutcome::Updated(updated))
            }
        }
    }
}
