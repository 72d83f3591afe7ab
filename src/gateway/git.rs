//! Gateway implementation backed by the `git` CLI

use super::{GatewaySession, PushOutcome, RepositoryGateway, WorkingCopy};
use crate::error::{Error, Result};
use crate::plan::FileEdit;
use crate::platform::PullRequestHost;
use crate::types::RepoId;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Default upper bound for a single git invocation
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(600);

/// stderr fragments that indicate a retryable network failure
const TRANSIENT_MARKERS: &[&str] = &[
    "timed out",
    "could not resolve host",
    "connection reset",
    "connection refused",
    "early eof",
    "remote end hung up",
    "rate limit",
    "temporarily unavailable",
    "error: 502",
    "error: 503",
    "error: 504",
];

/// Fork configuration: which host creates forks, and for whom
struct ForkSettings {
    host: Arc<dyn PullRequestHost>,
    organization: Option<String>,
}

/// Git CLI gateway
///
/// Clones over HTTPS (or any URL scheme when a remote base is configured)
/// and authenticates through an `http.extraheader` passed in the
/// environment, so the token never appears in a remote URL or on disk.
pub struct GitGateway {
    token: Option<String>,
    remote_base: Option<String>,
    author_name: String,
    author_email: String,
    forks: Option<ForkSettings>,
    command_timeout: Duration,
}

impl GitGateway {
    /// Create a gateway committing as the given identity
    pub fn new(author_name: impl Into<String>, author_email: impl Into<String>) -> Self {
        Self {
            token: None,
            remote_base: None,
            author_name: author_name.into(),
            author_email: author_email.into(),
            forks: None,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Authenticate HTTPS remotes with a token
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Resolve remotes as `<base>/<owner>/<name>.git` instead of `https://<host>/...`
    #[must_use]
    pub fn with_remote_base(mut self, base: impl Into<String>) -> Self {
        self.remote_base = Some(base.into());
        self
    }

    /// Push to forks created through `host` (optionally owned by an organization)
    #[must_use]
    pub fn with_forks(mut self, host: Arc<dyn PullRequestHost>, organization: Option<String>) -> Self {
        self.forks = Some(ForkSettings { host, organization });
        self
    }

    /// Bound every git invocation by `timeout`
    #[must_use]
    pub const fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Clone/push URL for a repository
    pub fn remote_url(&self, repo: &RepoId) -> String {
        match &self.remote_base {
            Some(base) => format!("{}/{}/{}.git", base.trim_end_matches('/'), repo.owner, repo.name),
            None => format!("https://{}/{}/{}.git", repo.host, repo.owner, repo.name),
        }
    }

    fn command(&self, cwd: &Path, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.args(args)
            .current_dir(cwd)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GIT_AUTHOR_NAME", &self.author_name)
            .env("GIT_AUTHOR_EMAIL", &self.author_email)
            .env("GIT_COMMITTER_NAME", &self.author_name)
            .env("GIT_COMMITTER_EMAIL", &self.author_email)
            .kill_on_drop(true);

        if let Some(token) = &self.token {
            let credentials = STANDARD.encode(format!("x-access-token:{token}"));
            cmd.env("GIT_CONFIG_COUNT", "1")
                .env("GIT_CONFIG_KEY_0", "http.extraheader")
                .env("GIT_CONFIG_VALUE_0", format!("AUTHORIZATION: basic {credentials}"));
        }
        cmd
    }

    /// Run git and return trimmed stdout
    async fn git(&self, cwd: &Path, args: &[&str]) -> Result<String> {
        debug!(?args, cwd = %cwd.display(), "running git");
        let output = tokio::time::timeout(self.command_timeout, self.command(cwd, args).output())
            .await
            .map_err(|_| {
                Error::transient_gateway(format!(
                    "git {} timed out after {}s",
                    args.first().unwrap_or(&""),
                    self.command_timeout.as_secs()
                ))
            })?
            .map_err(|e| Error::gateway(format!("failed to run git: {e}")))?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = format!("git {} failed: {stderr}", args.first().unwrap_or(&""));
        if is_transient_git_failure(&stderr) {
            Err(Error::transient_gateway(message))
        } else {
            Err(Error::gateway(message))
        }
    }

    /// Tree id of the remote branch, if it exists
    async fn remote_branch_tree(&self, copy: &WorkingCopy, url: &str, branch: &str) -> Result<Option<String>> {
        let refspec = format!("refs/heads/{branch}");
        match self
            .git(copy.path(), &["fetch", "--depth", "1", "--no-tags", url, &refspec])
            .await
        {
            Ok(_) => {}
            Err(Error::Gateway { message, .. })
                if message.contains("couldn't find remote ref")
                    || message.contains("could not find remote ref") =>
            {
                return Ok(None);
            }
            Err(e) => return Err(e),
        }
        let tree = self
            .git(copy.path(), &["rev-parse", "FETCH_HEAD^{tree}"])
            .await?;
        Ok(Some(tree))
    }
}

/// Whether git stderr describes a failure worth retrying
pub(crate) fn is_transient_git_failure(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    TRANSIENT_MARKERS.iter().any(|m| lower.contains(m))
}

#[async_trait]
impl RepositoryGateway for GitGateway {
    async fn checkout(
        &self,
        session: &GatewaySession,
        repo: &RepoId,
        base_branch: &str,
    ) -> Result<WorkingCopy> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("{}-", repo.name))
            .tempdir_in(session.root())?;
        let target = dir.path().to_string_lossy().into_owned();
        let url = self.remote_url(repo);

        debug!(%repo, base_branch, "cloning");
        self.git(
            session.root(),
            &[
                "clone",
                "--quiet",
                "--depth",
                "1",
                "--single-branch",
                "--no-tags",
                "--branch",
                base_branch,
                &url,
                &target,
            ],
        )
        .await?;
        debug!(%repo, "cloned");

        Ok(WorkingCopy::new(repo.clone(), base_branch, dir))
    }

    async fn ensure_fork(&self, session: &GatewaySession, upstream: &RepoId) -> Result<RepoId> {
        let Some(forks) = &self.forks else {
            return Ok(upstream.clone());
        };
        if let Some(fork) = session.cached_fork(upstream) {
            debug!(%upstream, %fork, "fork cached");
            return Ok(fork);
        }

        let fork = forks
            .host
            .create_fork(upstream, forks.organization.as_deref())
            .await?;
        debug!(%upstream, %fork, "fork ready");
        session.remember_fork(upstream.clone(), fork.clone());
        Ok(fork)
    }

    async fn prepare_branch(&self, copy: &WorkingCopy, branch: &str) -> Result<()> {
        debug!(repo = %copy.repo(), branch, base = copy.base_branch(), "resetting branch");
        self.git(copy.path(), &["checkout", "--quiet", "-B", branch, "HEAD"])
            .await?;
        Ok(())
    }

    async fn commit(&self, copy: &WorkingCopy, files: &[FileEdit], message: &str) -> Result<String> {
        let mut add_args = vec!["add", "--"];
        add_args.extend(files.iter().map(|f| f.path.as_str()));
        self.git(copy.path(), &add_args).await?;

        self.git(copy.path(), &["commit", "--quiet", "--no-verify", "-m", message])
            .await?;
        let sha = self.git(copy.path(), &["rev-parse", "HEAD"]).await?;
        debug!(repo = %copy.repo(), %sha, "committed");
        Ok(sha)
    }

    async fn push(&self, copy: &WorkingCopy, target: &RepoId, branch: &str) -> Result<PushOutcome> {
        let url = self.remote_url(target);
        let local_tree = self.git(copy.path(), &["rev-parse", "HEAD^{tree}"]).await?;

        if let Some(remote_tree) = self.remote_branch_tree(copy, &url, branch).await?
            && remote_tree == local_tree
        {
            debug!(%target, branch, "remote branch already up to date");
            return Ok(PushOutcome::UpToDate);
        }

        // The automation owns its head branch: it is rebuilt from the base
        // on every run and replaces whatever the remote holds.
        let refspec = format!("HEAD:refs/heads/{branch}");
        self.git(copy.path(), &["push", "--quiet", "--force", &url, &refspec])
            .await?;
        debug!(%target, branch, "pushed");
        Ok(PushOutcome::Pushed)
    }
}
