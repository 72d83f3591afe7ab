//! Shared command context for CLI commands
//!
//! Extracts the setup shared by `run` and `check`: loading the config and
//! wiring the gateway and PR hosts with credentials.

use runtime_bump::auth::get_github_auth;
use runtime_bump::config::{ConfigModel, load_config};
use runtime_bump::error::Result;
use runtime_bump::gateway::{GitGateway, RepositoryGateway};
use runtime_bump::platform::{HostSet, PullRequestHost};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Loaded configuration plus where it came from
pub struct CommandContext {
    /// Parsed and validated configuration
    pub config: ConfigModel,
    /// Path the configuration was read from
    pub config_path: PathBuf,
}

/// Collaborators needed to execute a run
pub struct Connections {
    /// Source-control gateway
    pub gateway: Arc<dyn RepositoryGateway>,
    /// Pull request host (dispatching per repository host)
    pub host: Arc<dyn PullRequestHost>,
}

impl CommandContext {
    /// Load and validate the configuration at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let config = load_config(path)?;
        debug!(
            path = %path.display(),
            runtimes = config.runtimes.len(),
            repositories = config.repositories.len(),
            "loaded config"
        );
        Ok(Self {
            config,
            config_path: path.to_path_buf(),
        })
    }

    /// Build the gateway and PR hosts.
    ///
    /// A token is required unless `dry_run` is set; dry runs only clone,
    /// which works anonymously for public repositories.
    pub async fn connect(
        &self,
        token: Option<String>,
        remote_base: Option<&str>,
        dry_run: bool,
    ) -> Result<Connections> {
        let settings = &self.config.settings;

        let token = match token {
            Some(token) => Some(token),
            None => match get_github_auth(None).await {
                Ok(auth) => {
                    debug!(source = %auth.source, "using discovered GitHub token");
                    Some(auth.token)
                }
                Err(e) if dry_run => {
                    warn!(error = %e, "no GitHub token, cloning anonymously");
                    None
                }
                Err(e) => return Err(e),
            },
        };

        let mut gateway = GitGateway::new(&settings.author_name, &settings.author_email);
        if let Some(base) = remote_base {
            gateway = gateway.with_remote_base(base);
        }

        let host: Arc<dyn PullRequestHost> = match &token {
            Some(token) => Arc::new(HostSet::github(
                token,
                self.config.repositories.iter().map(|r| &r.repo),
            )?),
            None => Arc::new(HostSet::new()),
        };

        if let Some(token) = token {
            gateway = gateway.with_token(token);
        }
        if settings.fork {
            gateway = gateway.with_forks(Arc::clone(&host), settings.fork_organization.clone());
        }

        Ok(Connections {
            gateway: Arc::new(gateway),
            host,
        })
    }
}
