//! Error types for runtime-bump

use thiserror::Error;

/// Errors produced while loading, planning, or executing an update run
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or inconsistent configuration (fatal, aborts the run)
    #[error("configuration error: {0}")]
    Config(String),

    /// A rule's target pattern is absent from the file (drift)
    #[error("{repo}: {rule} not found in {path}")]
    RuleNotFound {
        /// Repository the rule belongs to
        repo: String,
        /// File path or glob the rule was applied to
        path: String,
        /// Human-readable rule label
        rule: String,
    },

    /// Source-control operation failed
    #[error("gateway error: {message}")]
    Gateway {
        /// Failure description
        message: String,
        /// Whether the operation may succeed if retried
        transient: bool,
    },

    /// GitHub API error
    #[error("GitHub API error: {message}")]
    GitHubApi {
        /// Failure description
        message: String,
        /// Whether the request may succeed if retried
        transient: bool,
    },

    /// An existing pull request is in a state the automation will not touch
    #[error("pull request conflict in {repo}: {reason}")]
    PrConflict {
        /// Repository the pull request belongs to
        repo: String,
        /// Why the pull request cannot be reused
        reason: String,
    },

    /// Authentication failure
    #[error("authentication error: {0}")]
    Auth(String),

    /// Run was cancelled before this operation started
    #[error("cancelled")]
    Cancelled,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Permanent source-control failure
    pub fn gateway(message: impl Into<String>) -> Self {
        Self::Gateway {
            message: message.into(),
            transient: false,
        }
    }

    /// Source-control failure that may succeed on retry
    pub fn transient_gateway(message: impl Into<String>) -> Self {
        Self::Gateway {
            message: message.into(),
            transient: true,
        }
    }

    /// Permanent GitHub API failure
    pub fn github(message: impl Into<String>) -> Self {
        Self::GitHubApi {
            message: message.into(),
            transient: false,
        }
    }

    /// Whether retrying the failed operation can help.
    ///
    /// Configuration and drift errors are never transient.
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Gateway { transient, .. } | Self::GitHubApi { transient, .. } => *transient,
            _ => false,
        }
    }
}

/// HTTP status codes worth retrying against the API
const TRANSIENT_STATUS: &[u16] = &[429, 500, 502, 503, 504];

impl From<octocrab::Error> for Error {
    fn from(err: octocrab::Error) -> Self {
        match &err {
            octocrab::Error::GitHub { source, .. } => {
                let status = source.status_code.as_u16();
                let rate_limited =
                    status == 403 && source.message.to_lowercase().contains("rate limit");
                Self::GitHubApi {
                    message: format!("{status}: {}", source.message),
                    transient: rate_limited || TRANSIENT_STATUS.contains(&status),
                }
            }
            _ => {
                // Transport-level failures (connection reset, timeouts) are worth a retry
                let message = err.to_string();
                let lower = message.to_lowercase();
                let transient = lower.contains("timed out")
                    || lower.contains("timeout")
                    || lower.contains("connection");
                Self::GitHubApi { message, transient }
            }
        }
    }
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;
