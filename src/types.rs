//! Core types for runtime-bump

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Default source-control host for bare `owner/name` identifiers
pub const DEFAULT_HOST: &str = "github.com";

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^v?(0|[1-9][0-9]*)\.(0|[1-9][0-9]*)\.(0|[1-9][0-9]*)(?:[.+-][0-9A-Za-z.+-]+)?$")
        .expect("version pattern is valid")
});

/// A validated runtime version literal
///
/// Accepts `MAJOR.MINOR.PATCH` with an optional leading `v` and an optional
/// suffix introduced by `.`, `-` or `+` (e.g. `0.8.5.post1`, `2.1.0-rc1`).
/// The literal text is kept verbatim since it is what gets written into files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    /// Parse and validate a version literal
    pub fn parse(raw: &str) -> Result<Self> {
        if VERSION_RE.is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(Error::Config(format!(
                "malformed version '{raw}' (expected MAJOR.MINOR.PATCH[suffix])"
            )))
        }
    }

    /// The literal version text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Version with dots replaced by dashes, for branch names
    pub fn slug(&self) -> String {
        self.0.replace(['.', '+'], "-")
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A runtime and the version every target repository should reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeVersion {
    /// Runtime name (e.g. "vllm")
    pub runtime: String,
    /// Desired version
    pub version: Version,
}

/// Host-qualified repository identifier (`github.com/owner/name`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoId {
    /// Source-control host (e.g. "github.com")
    pub host: String,
    /// Repository owner (user or organization)
    pub owner: String,
    /// Repository name
    pub name: String,
}

impl RepoId {
    /// Create a repository id
    pub fn new(host: impl Into<String>, owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// `owner/name` without the host
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Whether the repository lives on github.com
    pub fn is_github_dot_com(&self) -> bool {
        self.host == DEFAULT_HOST
    }

    fn from_segments(host: &str, path: &str) -> Option<Self> {
        let path = path.trim_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);
        let mut parts = path.split('/');
        let owner = parts.next().filter(|s| !s.is_empty())?;
        let name = parts.next().filter(|s| !s.is_empty())?;
        if parts.next().is_some() || host.is_empty() {
            return None;
        }
        Some(Self::new(host, owner, name))
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.host, self.owner, self.name)
    }
}

impl FromStr for RepoId {
    type Err = Error;

    /// Parse `owner/name`, `host/owner/name`, `https://host/owner/name(.git)`
    /// or `git@host:owner/name(.git)`.
    fn from_str(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let invalid = || Error::Config(format!("invalid repository identifier '{raw}'"));

        if raw.contains("://") {
            let url = url::Url::parse(raw).map_err(|_| invalid())?;
            let host = url.host_str().ok_or_else(invalid)?;
            return Self::from_segments(host, url.path()).ok_or_else(invalid);
        }

        if let Some(rest) = raw.strip_prefix("git@") {
            let (host, path) = rest.split_once(':').ok_or_else(invalid)?;
            return Self::from_segments(host, path).ok_or_else(invalid);
        }

        match raw.matches('/').count() {
            1 => Self::from_segments(DEFAULT_HOST, raw).ok_or_else(invalid),
            2 => {
                let (host, path) = raw.split_once('/').ok_or_else(invalid)?;
                Self::from_segments(host, path).ok_or_else(invalid)
            }
            _ => Err(invalid()),
        }
    }
}

/// Component family a target repository belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Component {
    /// A VLLM-family runtime repository (individual-PR policy)
    Vllm,
    /// The model-controller repository (consolidated-PR policy)
    OdhController,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vllm => write!(f, "vllm"),
            Self::OdhController => write!(f, "odh-controller"),
        }
    }
}

/// PR state (open, closed, merged)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrState {
    /// PR is open
    Open,
    /// PR was closed without merging
    Closed,
    /// PR was merged
    Merged,
}

impl fmt::Display for PrState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Merged => write!(f, "merged"),
        }
    }
}

/// A pull request as reported by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// Web URL for the PR
    pub html_url: String,
    /// Base branch name
    pub base_ref: String,
    /// Head branch name
    pub head_ref: String,
    /// PR title
    pub title: String,
    /// PR body
    pub body: Option<String>,
    /// Current state
    pub state: PrState,
    /// Login of the PR author
    pub author: Option<String>,
}

/// Everything needed to open (or refresh) one pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestSpec {
    /// Repository the PR is opened against
    pub repo: RepoId,
    /// Owner of the head branch (fork owner, or the upstream owner)
    pub head_owner: String,
    /// Source branch
    pub source_branch: String,
    /// Target branch
    pub target_branch: String,
    /// PR title
    pub title: String,
    /// PR body
    pub body: String,
    /// Whether this PR aggregates changes across files/templates
    pub consolidated: bool,
}

impl PullRequestSpec {
    /// Head reference in `owner:branch` form
    pub fn head_ref(&self) -> String {
        format!("{}:{}", self.head_owner, self.source_branch)
    }
}
