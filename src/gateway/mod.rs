//! Repository gateway - fork, clone, branch, commit, push
//!
//! The gateway is consumed by the executor; planning only ever sees a
//! [`WorkingCopy`] through its read-only [`ContentSource`] view.

mod git;

pub use git::GitGateway;

use crate::error::{Error, Result};
use crate::plan::{ContentSource, FileEdit};
use crate::types::RepoId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::{Component as PathComponent, Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Run-scoped gateway state.
///
/// Holds the scratch directory all working copies live under and the
/// upstream → fork cache, so nothing about forks is process-global.
#[derive(Debug)]
pub struct GatewaySession {
    root: TempDir,
    forks: Mutex<HashMap<RepoId, RepoId>>,
}

impl GatewaySession {
    /// Create a session with a fresh scratch directory
    pub fn new() -> Result<Self> {
        let root = tempfile::Builder::new().prefix("runtime-bump-").tempdir()?;
        Ok(Self {
            root,
            forks: Mutex::new(HashMap::new()),
        })
    }

    /// Scratch directory for this run
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Previously resolved fork of `upstream`
    pub fn cached_fork(&self, upstream: &RepoId) -> Option<RepoId> {
        self.forks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(upstream)
            .cloned()
    }

    /// Remember the fork of `upstream` for the rest of the run
    pub fn remember_fork(&self, upstream: RepoId, fork: RepoId) {
        self.forks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(upstream, fork);
    }
}

/// A local checkout of one repository at its base branch.
///
/// Owned by exactly one worker; the directory is removed when the value is
/// dropped, on success, failure and cancellation alike.
#[derive(Debug)]
pub struct WorkingCopy {
    repo: RepoId,
    base_branch: String,
    dir: TempDir,
}

impl WorkingCopy {
    /// Wrap an already-populated directory
    pub fn new(repo: RepoId, base_branch: impl Into<String>, dir: TempDir) -> Self {
        Self {
            repo,
            base_branch: base_branch.into(),
            dir,
        }
    }

    /// Repository this copy belongs to
    pub const fn repo(&self) -> &RepoId {
        &self.repo
    }

    /// Branch the copy was checked out at
    pub fn base_branch(&self) -> &str {
        &self.base_branch
    }

    /// Root directory of the checkout
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Resolve a repository-relative path inside the checkout.
    ///
    /// Absolute paths and `..` components are rejected.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let candidate = Path::new(relative);
        let escapes = candidate
            .components()
            .any(|c| !matches!(c, PathComponent::Normal(_) | PathComponent::CurDir));
        if relative.is_empty() || escapes {
            return Err(Error::Config(format!(
                "path '{relative}' is not inside the repository"
            )));
        }
        Ok(self.dir.path().join(candidate))
    }

    /// Whether `path` resolves, through any symlinks, to somewhere inside the checkout
    fn contains(&self, path: &Path) -> bool {
        match (fs::canonicalize(self.path()), fs::canonicalize(path)) {
            (Ok(root), Ok(target)) => target.starts_with(root),
            _ => false,
        }
    }
}

impl ContentSource for WorkingCopy {
    fn read_file(&self, path: &str) -> Result<Option<String>> {
        let full = self.resolve(path)?;
        if !full.is_file() || !self.contains(&full) {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(full)?))
    }

    /// Regular files, plus symlinks resolving to a file inside the checkout.
    fn list_files(&self) -> Result<Vec<String>> {
        let root = self.path();
        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || e.file_name() != ".git");
        for entry in walker {
            let entry = entry.map_err(std::io::Error::from)?;
            let file_type = entry.file_type();
            let listed = file_type.is_file()
                || (file_type.is_symlink()
                    && entry.path().is_file()
                    && self.contains(entry.path()));
            if !listed {
                continue;
            }
            let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
            files.push(rel.to_string_lossy().replace('\\', "/"));
        }
        files.sort();
        Ok(files)
    }
}

/// Result of pushing the automation branch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The branch was (re)written on the remote
    Pushed,
    /// The remote branch already carried identical content; nothing pushed
    UpToDate,
}

/// Source-control operations needed to materialize a change set.
///
/// `checkout` is read-only; everything else mutates either the working copy
/// or the remote and is never called in dry-run mode.
#[async_trait]
pub trait RepositoryGateway: Send + Sync {
    /// Clone `repo` at `base_branch` into a fresh working copy
    async fn checkout(
        &self,
        session: &GatewaySession,
        repo: &RepoId,
        base_branch: &str,
    ) -> Result<WorkingCopy>;

    /// Repository the branch should be pushed to (the fork, or `upstream`)
    async fn ensure_fork(&self, session: &GatewaySession, upstream: &RepoId) -> Result<RepoId>;

    /// Create or reset `branch` to the checked-out base
    async fn prepare_branch(&self, copy: &WorkingCopy, branch: &str) -> Result<()>;

    /// Write full new file contents into the working copy
    async fn write_files(&self, copy: &WorkingCopy, files: &[FileEdit]) -> Result<()> {
        for file in files {
            let full = copy.resolve(&file.path)?;
            tokio::fs::write(&full, &file.content).await?;
        }
        Ok(())
    }

    /// Commit the written files as one commit; returns the commit id
    async fn commit(&self, copy: &WorkingCopy, files: &[FileEdit], message: &str)
    -> Result<String>;

    /// Push the current commit to `branch` on `target`
    async fn push(&self, copy: &WorkingCopy, target: &RepoId, branch: &str)
    -> Result<PushOutcome>;
}
