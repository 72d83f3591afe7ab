//! Mock repository gateway for testing

#![allow(dead_code)]

use async_trait::async_trait;
use runtime_bump::error::{Error, Result};
use runtime_bump::gateway::{GatewaySession, PushOutcome, RepositoryGateway, WorkingCopy};
use runtime_bump::plan::FileEdit;
use runtime_bump::types::RepoId;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use tempfile::TempDir;

/// Call record for `commit`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitCall {
    pub repo: RepoId,
    pub paths: Vec<String>,
    pub message: String,
}

/// Call record for `push`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushCall {
    pub repo: RepoId,
    pub target: RepoId,
    pub branch: String,
}

/// In-memory gateway: repositories are file maps, checkouts are temp dirs.
///
/// Features:
/// - Per-repository file contents served through real working copies
/// - Written file contents captured per repository
/// - Call tracking for verification
/// - Error injection per repository (permanent, or transient for N calls)
pub struct MockGateway {
    repos: Mutex<HashMap<RepoId, BTreeMap<String, String>>>,
    written: Mutex<HashMap<RepoId, BTreeMap<String, String>>>,
    // Call tracking
    checkout_calls: Mutex<Vec<(RepoId, String)>>,
    fork_calls: Mutex<Vec<RepoId>>,
    branch_calls: Mutex<Vec<(RepoId, String)>>,
    commit_calls: Mutex<Vec<CommitCall>>,
    push_calls: Mutex<Vec<PushCall>>,
    // Behavior
    push_outcome: Mutex<PushOutcome>,
    fork_owner: Mutex<Option<String>>,
    // Error injection
    error_on_checkout: Mutex<HashMap<RepoId, String>>,
    error_on_push: Mutex<HashMap<RepoId, String>>,
    transient_push_failures: AtomicU32,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            repos: Mutex::new(HashMap::new()),
            written: Mutex::new(HashMap::new()),
            checkout_calls: Mutex::new(Vec::new()),
            fork_calls: Mutex::new(Vec::new()),
            branch_calls: Mutex::new(Vec::new()),
            commit_calls: Mutex::new(Vec::new()),
            push_calls: Mutex::new(Vec::new()),
            push_outcome: Mutex::new(PushOutcome::Pushed),
            fork_owner: Mutex::new(None),
            error_on_checkout: Mutex::new(HashMap::new()),
            error_on_push: Mutex::new(HashMap::new()),
            transient_push_failures: AtomicU32::new(0),
        }
    }

    /// Add a file to a repository's base branch
    pub fn add_file(&self, repo: &RepoId, path: &str, content: &str) {
        self.repos
            .lock()
            .unwrap()
            .entry(repo.clone())
            .or_default()
            .insert(path.to_string(), content.to_string());
    }

    /// Push to `<owner>/<name>` forks instead of upstream
    pub fn fork_to(&self, owner: &str) {
        *self.fork_owner.lock().unwrap() = Some(owner.to_string());
    }

    /// What `push` reports
    pub fn set_push_outcome(&self, outcome: PushOutcome) {
        *self.push_outcome.lock().unwrap() = outcome;
    }

    // === Error injection methods ===

    /// Make `checkout` of `repo` fail permanently
    pub fn fail_checkout(&self, repo: &RepoId, msg: &str) {
        self.error_on_checkout
            .lock()
            .unwrap()
            .insert(repo.clone(), msg.to_string());
    }

    /// Make `push` to `repo` fail permanently
    pub fn fail_push(&self, repo: &RepoId, msg: &str) {
        self.error_on_push
            .lock()
            .unwrap()
            .insert(repo.clone(), msg.to_string());
    }

    /// Make the next `count` pushes fail transiently
    pub fn fail_push_transiently(&self, count: u32) {
        self.transient_push_failures.store(count, Ordering::SeqCst);
    }

    // === Call inspection ===

    pub fn checkout_calls(&self) -> Vec<(RepoId, String)> {
        self.checkout_calls.lock().unwrap().clone()
    }

    pub fn fork_calls(&self) -> Vec<RepoId> {
        self.fork_calls.lock().unwrap().clone()
    }

    pub fn branch_calls(&self) -> Vec<(RepoId, String)> {
        self.branch_calls.lock().unwrap().clone()
    }

    pub fn commit_calls(&self) -> Vec<CommitCall> {
        self.commit_calls.lock().unwrap().clone()
    }

    pub fn push_calls(&self) -> Vec<PushCall> {
        self.push_calls.lock().unwrap().clone()
    }

    /// Content written into a repository's working copy
    pub fn written(&self, repo: &RepoId, path: &str) -> Option<String> {
        self.written
            .lock()
            .unwrap()
            .get(repo)
            .and_then(|files| files.get(path).cloned())
    }

    /// Number of mutating calls (everything except checkout)
    pub fn mutation_count(&self) -> usize {
        self.fork_calls().len()
            + self.branch_calls().len()
            + self.commit_calls().len()
            + self.push_calls().len()
            + self.written.lock().unwrap().len()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RepositoryGateway for MockGateway {
    async fn checkout(
        &self,
        session: &GatewaySession,
        repo: &RepoId,
        base_branch: &str,
    ) -> Result<WorkingCopy> {
        self.checkout_calls
            .lock()
            .unwrap()
            .push((repo.clone(), base_branch.to_string()));

        if let Some(msg) = self.error_on_checkout.lock().unwrap().get(repo) {
            return Err(Error::gateway(msg.clone()));
        }

        let dir = TempDir::new_in(session.root())?;
        let files = self
            .repos
            .lock()
            .unwrap()
            .get(repo)
            .cloned()
            .unwrap_or_default();
        for (path, content) in files {
            let full = dir.path().join(&path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(full, content)?;
        }
        Ok(WorkingCopy::new(repo.clone(), base_branch, dir))
    }

    async fn ensure_fork(&self, session: &GatewaySession, upstream: &RepoId) -> Result<RepoId> {
        let Some(owner) = self.fork_owner.lock().unwrap().clone() else {
            return Ok(upstream.clone());
        };
        if let Some(fork) = session.cached_fork(upstream) {
            return Ok(fork);
        }
        self.fork_calls.lock().unwrap().push(upstream.clone());
        let fork = RepoId::new(&upstream.host, owner, &upstream.name);
        session.remember_fork(upstream.clone(), fork.clone());
        Ok(fork)
    }

    async fn prepare_branch(&self, copy: &WorkingCopy, branch: &str) -> Result<()> {
        self.branch_calls
            .lock()
            .unwrap()
            .push((copy.repo().clone(), branch.to_string()));
        Ok(())
    }

    async fn write_files(&self, copy: &WorkingCopy, files: &[FileEdit]) -> Result<()> {
        for file in files {
            std::fs::write(copy.resolve(&file.path)?, &file.content)?;
            self.written
                .lock()
                .unwrap()
                .entry(copy.repo().clone())
                .or_default()
                .insert(file.path.clone(), file.content.clone());
        }
        Ok(())
    }

    async fn commit(&self, copy: &WorkingCopy, files: &[FileEdit], message: &str) -> Result<String> {
        let mut calls = self.commit_calls.lock().unwrap();
        calls.push(CommitCall {
            repo: copy.repo().clone(),
            paths: files.iter().map(|f| f.path.clone()).collect(),
            message: message.to_string(),
        });
        Ok(format!("{:040x}", calls.len()))
    }

    async fn push(&self, copy: &WorkingCopy, target: &RepoId, branch: &str) -> Result<PushOutcome> {
        self.push_calls.lock().unwrap().push(PushCall {
            repo: copy.repo().clone(),
            target: target.clone(),
            branch: branch.to_string(),
        });

        if let Some(msg) = self.error_on_push.lock().unwrap().get(copy.repo()) {
            return Err(Error::gateway(msg.clone()));
        }
        let remaining = self.transient_push_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_push_failures
                .store(remaining - 1, Ordering::SeqCst);
            return Err(Error::transient_gateway("connection reset by peer"));
        }
        Ok(*self.push_outcome.lock().unwrap())
    }
}
