//! GitHub pull request host

use crate::error::{Error, Result};
use crate::platform::PullRequestHost;
use crate::types::{DEFAULT_HOST, PrState, PullRequest, PullRequestSpec, RepoId};
use async_trait::async_trait;
use octocrab::Octocrab;
use octocrab::params::{Direction, State, pulls::Sort};
use tracing::debug;

/// GitHub service using octocrab
///
/// One instance serves every repository on a single host (github.com or a
/// GitHub Enterprise server).
pub struct GitHubService {
    client: Octocrab,
    host: String,
}

impl GitHubService {
    /// Create a service for `host` (github.com when `None`)
    pub fn new(token: &str, host: Option<String>) -> Result<Self> {
        let mut builder = Octocrab::builder().personal_token(token.to_string());

        let host = host.unwrap_or_else(|| DEFAULT_HOST.to_string());
        if host != DEFAULT_HOST {
            let base_url = format!("https://{host}/api/v3");
            builder = builder
                .base_uri(&base_url)
                .map_err(|e| Error::github(e.to_string()))?;
        }

        let client = builder.build().map_err(|e| Error::github(e.to_string()))?;
        Ok(Self { client, host })
    }

    /// Host this service talks to
    pub fn host(&self) -> &str {
        &self.host
    }
}

/// Helper to convert octocrab PR to our `PullRequest` type
fn pr_from_octocrab(pr: &octocrab::models::pulls::PullRequest) -> PullRequest {
    let state = match pr.state {
        Some(octocrab::models::IssueState::Open) => PrState::Open,
        _ if pr.merged_at.is_some() => PrState::Merged,
        // IssueState is non-exhaustive, so use wildcard for Closed and any future variants
        Some(_) | None => PrState::Closed,
    };

    PullRequest {
        number: pr.number,
        html_url: pr
            .html_url
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default(),
        base_ref: pr.base.ref_field.clone(),
        head_ref: pr.head.ref_field.clone(),
        title: pr.title.as_deref().unwrap_or_default().to_string(),
        body: pr.body.clone(),
        state,
        author: pr.user.as_ref().map(|u| u.login.clone()),
    }
}

#[async_trait]
impl PullRequestHost for GitHubService {
    async fn find_pull_request(&self, repo: &RepoId, head: &str) -> Result<Option<PullRequest>> {
        debug!(%repo, head, "finding existing PR");

        let prs = self
            .client
            .pulls(&repo.owner, &repo.name)
            .list()
            .head(head.to_string())
            .state(State::All)
            .sort(Sort::Created)
            .direction(Direction::Descending)
            .per_page(10)
            .send()
            .await?;

        let result = prs.items.first().map(pr_from_octocrab);
        if let Some(ref pr) = result {
            debug!(pr_number = pr.number, state = %pr.state, "found existing PR");
        } else {
            debug!("no existing PR found");
        }
        Ok(result)
    }

    async fn create_pull_request(&self, spec: &PullRequestSpec) -> Result<PullRequest> {
        let head = spec.head_ref();
        debug!(repo = %spec.repo, head, base = spec.target_branch, "creating PR");

        let pr = self
            .client
            .pulls(&spec.repo.owner, &spec.repo.name)
            .create(&spec.title, head, &spec.target_branch)
            .body(&spec.body)
            .maintainer_can_modify(true)
            .send()
            .await?;

        let result = pr_from_octocrab(&pr);
        debug!(pr_number = result.number, "created PR");
        Ok(result)
    }

    async fn update_pull_request(
        &self,
        repo: &RepoId,
        number: u64,
        spec: &PullRequestSpec,
    ) -> Result<PullRequest> {
        debug!(%repo, pr_number = number, "updating PR");
        let pr = self
            .client
            .pulls(&repo.owner, &repo.name)
            .update(number)
            .title(&spec.title)
            .body(&spec.body)
            .base(&spec.target_branch)
            .send()
            .await?;

        debug!(pr_number = number, "updated PR");
        Ok(pr_from_octocrab(&pr))
    }

    async fn create_fork(&self, upstream: &RepoId, organization: Option<&str>) -> Result<RepoId> {
        debug!(%upstream, organization, "creating fork");
        let repos = self.client.repos(&upstream.owner, &upstream.name);
        let mut builder = repos.create_fork();
        if let Some(org) = organization {
            builder = builder.organization(org);
        }
        let fork = builder.send().await?;

        let owner = fork
            .owner
            .map(|o| o.login)
            .ok_or_else(|| Error::github(format!("fork of {upstream} has no owner")))?;
        Ok(RepoId::new(&self.host, owner, fork.name))
    }

    async fn current_user(&self, host: &str) -> Result<String> {
        if host != self.host {
            return Err(Error::Internal(format!(
                "GitHub service for {} asked about {host}",
                self.host
            )));
        }
        let user = self.client.current().user().await?;
        debug!(login = %user.login, "authenticated user");
        Ok(user.login)
    }
}
