//! GitHub token discovery

use super::AuthSource;
use crate::error::{Error, Result};
use crate::platform::{GitHubService, PullRequestHost};
use crate::types::DEFAULT_HOST;
use tokio::process::Command;
use tracing::debug;

/// Environment variables checked for a token, in order
const TOKEN_VARS: &[&str] = &["GITHUB_TOKEN", "GH_TOKEN"];

/// A discovered GitHub token
#[derive(Clone)]
pub struct GitHubAuthConfig {
    /// The token itself
    pub token: String,
    /// Where it came from
    pub source: AuthSource,
    /// Host it is meant for
    pub host: String,
}

impl std::fmt::Debug for GitHubAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubAuthConfig")
            .field("token", &"<redacted>")
            .field("source", &self.source)
            .field("host", &self.host)
            .finish()
    }
}

fn token_from_env() -> Option<(&'static str, String)> {
    TOKEN_VARS.iter().find_map(|&var| {
        std::env::var(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(|v| (var, v))
    })
}

/// Get a GitHub token for `host` (github.com when `None`)
///
/// Checks `GITHUB_TOKEN`, then `GH_TOKEN`, then `gh auth token`.
pub async fn get_github_auth(host: Option<&str>) -> Result<GitHubAuthConfig> {
    let host = host.unwrap_or(DEFAULT_HOST).to_string();

    if let Some((var, token)) = token_from_env() {
        debug!(%host, var, "using GitHub token from environment");
        return Ok(GitHubAuthConfig {
            token,
            source: AuthSource::EnvVar(var),
            host,
        });
    }

    debug!(%host, "asking gh CLI for a token");
    let output = Command::new("gh")
        .args(["auth", "token", "--hostname", &host])
        .output()
        .await
        .map_err(|e| {
            Error::Auth(format!(
                "no GITHUB_TOKEN set and the gh CLI could not be run: {e}"
            ))
        })?;

    if !output.status.success() {
        return Err(Error::Auth(format!(
            "no GITHUB_TOKEN set and `gh auth token` failed for {host}; run `gh auth login` or export GITHUB_TOKEN"
        )));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(Error::Auth(format!("gh CLI returned an empty token for {host}")));
    }

    Ok(GitHubAuthConfig {
        token,
        source: AuthSource::Cli,
        host,
    })
}

/// Verify a token by asking the host who it belongs to; returns the login
pub async fn test_github_auth(config: &GitHubAuthConfig) -> Result<String> {
    let service = GitHubService::new(&config.token, Some(config.host.clone()))?;
    service
        .current_user(&config.host)
        .await
        .map_err(|e| Error::Auth(format!("token rejected by {}: {e}", config.host)))
}
