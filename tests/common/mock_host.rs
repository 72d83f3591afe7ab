//! Mock pull request host for testing

#![allow(dead_code)]

use async_trait::async_trait;
use runtime_bump::error::{Error, Result};
use runtime_bump::platform::PullRequestHost;
use runtime_bump::types::{PrState, PullRequest, PullRequestSpec, RepoId};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Call record for `update_pull_request`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePrCall {
    pub repo: RepoId,
    pub number: u64,
    pub title: String,
    pub base: String,
}

/// Simple mock pull request host for testing
///
/// Features:
/// - Auto-incrementing PR numbers
/// - Created and updated PRs become visible to later `find_pull_request` calls
/// - Call tracking for verification
/// - Error injection (permanent, or transient for the first N calls)
pub struct MockHost {
    login: String,
    next_pr_number: AtomicU64,
    /// Current PR per `repo` + head ref
    prs: Mutex<HashMap<(RepoId, String), PullRequest>>,
    // Call tracking
    find_calls: Mutex<Vec<(RepoId, String)>>,
    create_calls: Mutex<Vec<PullRequestSpec>>,
    update_calls: Mutex<Vec<UpdatePrCall>>,
    fork_calls: Mutex<Vec<RepoId>>,
    current_user_calls: AtomicU32,
    // Error injection
    error_on_create: Mutex<Option<String>>,
    transient_create_failures: AtomicU32,
}

impl MockHost {
    /// Create a mock authenticated as `bot`
    pub fn new() -> Self {
        Self::with_login("bot")
    }

    /// Create a mock authenticated as `login`
    pub fn with_login(login: &str) -> Self {
        Self {
            login: login.to_string(),
            next_pr_number: AtomicU64::new(1),
            prs: Mutex::new(HashMap::new()),
            find_calls: Mutex::new(Vec::new()),
            create_calls: Mutex::new(Vec::new()),
            update_calls: Mutex::new(Vec::new()),
            fork_calls: Mutex::new(Vec::new()),
            current_user_calls: AtomicU32::new(0),
            error_on_create: Mutex::new(None),
            transient_create_failures: AtomicU32::new(0),
        }
    }

    // === Error injection methods ===

    /// Make `create_pull_request` return a permanent error
    pub fn fail_create(&self, msg: &str) {
        *self.error_on_create.lock().unwrap() = Some(msg.to_string());
    }

    /// Make the next `count` `create_pull_request` calls fail transiently
    pub fn fail_create_transiently(&self, count: u32) {
        self.transient_create_failures.store(count, Ordering::SeqCst);
    }

    /// Seed an existing PR for `repo` and head ref `owner:branch`
    pub fn set_existing_pr(&self, repo: &RepoId, head: &str, pr: PullRequest) {
        self.prs
            .lock()
            .unwrap()
            .insert((repo.clone(), head.to_string()), pr);
    }

    // === Call inspection ===

    pub fn find_calls(&self) -> Vec<(RepoId, String)> {
        self.find_calls.lock().unwrap().clone()
    }

    pub fn create_calls(&self) -> Vec<PullRequestSpec> {
        self.create_calls.lock().unwrap().clone()
    }

    pub fn update_calls(&self) -> Vec<UpdatePrCall> {
        self.update_calls.lock().unwrap().clone()
    }

    pub fn fork_calls(&self) -> Vec<RepoId> {
        self.fork_calls.lock().unwrap().clone()
    }

    pub fn current_user_calls(&self) -> u32 {
        self.current_user_calls.load(Ordering::SeqCst)
    }

    /// Whether no PR was created or updated
    pub fn untouched(&self) -> bool {
        self.create_calls().is_empty() && self.update_calls().is_empty()
    }

    fn pr_from_spec(&self, number: u64, spec: &PullRequestSpec) -> PullRequest {
        PullRequest {
            number,
            html_url: format!(
                "https://{}/{}/pull/{number}",
                spec.repo.host,
                spec.repo.slug()
            ),
            base_ref: spec.target_branch.clone(),
            head_ref: spec.source_branch.clone(),
            title: spec.title.clone(),
            body: Some(spec.body.clone()),
            state: PrState::Open,
            author: Some(self.login.clone()),
        }
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PullRequestHost for MockHost {
    async fn find_pull_request(&self, repo: &RepoId, head: &str) -> Result<Option<PullRequest>> {
        self.find_calls
            .lock()
            .unwrap()
            .push((repo.clone(), head.to_string()));
        Ok(self
            .prs
            .lock()
            .unwrap()
            .get(&(repo.clone(), head.to_string()))
            .cloned())
    }

    async fn create_pull_request(&self, spec: &PullRequestSpec) -> Result<PullRequest> {
        self.create_calls.lock().unwrap().push(spec.clone());

        if let Some(msg) = self.error_on_create.lock().unwrap().as_ref() {
            return Err(Error::github(msg.clone()));
        }
        let remaining = self.transient_create_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_create_failures
                .store(remaining - 1, Ordering::SeqCst);
            return Err(Error::GitHubApi {
                message: "503: service unavailable".to_string(),
                transient: true,
            });
        }

        let number = self.next_pr_number.fetch_add(1, Ordering::SeqCst);
        let pr = self.pr_from_spec(number, spec);
        self.prs
            .lock()
            .unwrap()
            .insert((spec.repo.clone(), spec.head_ref()), pr.clone());
        Ok(pr)
    }

    async fn update_pull_request(
        &self,
        repo: &RepoId,
        number: u64,
        spec: &PullRequestSpec,
    ) -> Result<PullRequest> {
        self.update_calls.lock().unwrap().push(UpdatePrCall {
            repo: repo.clone(),
            number,
            title: spec.title.clone(),
            base: spec.target_branch.clone(),
        });
        let pr = self.pr_from_spec(number, spec);
        self.prs
            .lock()
            .unwrap()
            .insert((repo.clone(), spec.head_ref()), pr.clone());
        Ok(pr)
    }

    async fn create_fork(&self, upstream: &RepoId, organization: Option<&str>) -> Result<RepoId> {
        self.fork_calls.lock().unwrap().push(upstream.clone());
        let owner = organization.unwrap_or(&self.login);
        Ok(RepoId::new(&upstream.host, owner, &upstream.name))
    }

    async fn current_user(&self, _host: &str) -> Result<String> {
        self.current_user_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.login.clone())
    }
}
