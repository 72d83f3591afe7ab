//! GitHub credential discovery
//!
//! A token comes from the environment (as set by CI workflows) or from the
//! `gh` CLI's stored login.

mod github;

pub use github::{GitHubAuthConfig, get_github_auth, test_github_auth};

use std::fmt;

/// Where a token was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSource {
    /// `gh auth token`
    Cli,
    /// The named environment variable
    EnvVar(&'static str),
}

impl fmt::Display for AuthSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cli => write!(f, "gh CLI"),
            Self::EnvVar(name) => write!(f, "${name}"),
        }
    }
}
