//! Per-host dispatch

use crate::error::{Error, Result};
use crate::platform::{GitHubService, PullRequestHost};
use crate::types::{PullRequest, PullRequestSpec, RepoId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Routes each call to the service registered for the repository's host
#[derive(Default, Clone)]
pub struct HostSet {
    hosts: HashMap<String, Arc<dyn PullRequestHost>>,
}

impl HostSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `service` for `host`
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>, service: Arc<dyn PullRequestHost>) -> Self {
        self.hosts.insert(host.into(), service);
        self
    }

    /// One GitHub service per distinct host in `repos`, all sharing `token`
    pub fn github<'a>(token: &str, repos: impl IntoIterator<Item = &'a RepoId>) -> Result<Self> {
        let mut set = Self::new();
        for repo in repos {
            if set.hosts.contains_key(&repo.host) {
                continue;
            }
            let service = GitHubService::new(token, Some(repo.host.clone()))?;
            set.hosts.insert(repo.host.clone(), Arc::new(service));
        }
        Ok(set)
    }

    /// Hosts with a registered service
    pub fn hosts(&self) -> Vec<&str> {
        let mut hosts: Vec<&str> = self.hosts.keys().map(String::as_str).collect();
        hosts.sort_unstable();
        hosts
    }

    fn service(&self, host: &str) -> Result<&Arc<dyn PullRequestHost>> {
        self.hosts
            .get(host)
            .ok_or_else(|| Error::Config(format!("no pull request host configured for {host}")))
    }
}

#[async_trait]
impl PullRequestHost for HostSet {
    async fn find_pull_request(&self, repo: &RepoId, head: &str) -> Result<Option<PullRequest>> {
        self.service(&repo.host)?.find_pull_request(repo, head).await
    }

    async fn create_pull_request(&self, spec: &PullRequestSpec) -> Result<PullRequest> {
        self.service(&spec.repo.host)?.create_pull_request(spec).await
    }

    async fn update_pull_request(
        &self,
        repo: &RepoId,
        number: u64,
        spec: &PullRequestSpec,
    ) -> Result<PullRequest> {
        self.service(&repo.host)?
            .update_pull_request(repo, number, spec)
            .await
    }

    async fn create_fork(&self, upstream: &RepoId, organization: Option<&str>) -> Result<RepoId> {
        self.service(&upstream.host)?
            .create_fork(upstream, organization)
            .await
    }

    async fn current_user(&self, host: &str) -> Result<String> {
        self.service(host)?.current_user(host).await
    }
}
