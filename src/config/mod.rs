//! Typed configuration model
//!
//! The model is loaded once per run and is read-only afterwards. Loading is
//! referentially transparent: equal documents always produce equal models.

mod loader;

pub use loader::{load_config, parse_config, ConfigFormat};

use crate::rules::UpdateRule;
use crate::types::{Component, RepoId, RuntimeVersion, Version};
use std::collections::BTreeMap;

/// Default annotation key for model-controller templates
pub const DEFAULT_ANNOTATION_KEY: &str = "opendatahub.io/runtime-version";

/// Default base branch for target repositories
pub const DEFAULT_BRANCH: &str = "main";

/// Run-wide settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Prefix for automation-owned head branches
    pub branch_prefix: String,
    /// Push to a fork instead of the upstream repository
    pub fork: bool,
    /// Organization that should own forks (authenticated user when `None`)
    pub fork_organization: Option<String>,
    /// Commit author name
    pub author_name: String,
    /// Commit author email
    pub author_email: String,
    /// Number of change sets processed concurrently
    pub max_parallel: usize,
    /// Total attempts for transient failures
    pub retry_attempts: u32,
    /// Base delay for exponential backoff, in milliseconds
    pub retry_base_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            branch_prefix: "runtime-bump".to_string(),
            fork: false,
            fork_organization: None,
            author_name: "runtime-bump".to_string(),
            author_email: "runtime-bump@users.noreply.github.com".to_string(),
            max_parallel: 4,
            retry_attempts: 3,
            retry_base_delay_ms: 500,
        }
    }
}

/// A downstream repository and the rules that keep it in sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRepository {
    /// Host-qualified repository identifier
    pub repo: RepoId,
    /// Branch changes are based on and PRs target
    pub default_branch: String,
    /// Component family (used by the component filter)
    pub component: Component,
    /// Whether all changes go into one consolidated PR
    pub consolidate: bool,
    /// Rules in declared order
    pub rules: Vec<UpdateRule>,
}

impl TargetRepository {
    /// Distinct runtimes the rules bind to, in declared order
    pub fn runtimes(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for rule in &self.rules {
            if !seen.contains(&rule.runtime()) {
                seen.push(rule.runtime());
            }
        }
        seen
    }
}

/// The whole configuration: desired versions plus the target fleet
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigModel {
    /// Runtime name to desired version
    pub runtimes: BTreeMap<String, Version>,
    /// Target repositories in declared order
    pub repositories: Vec<TargetRepository>,
    /// Run-wide settings
    pub settings: Settings,
}

impl ConfigModel {
    /// Desired version for a runtime
    pub fn version_of(&self, runtime: &str) -> Option<&Version> {
        self.runtimes.get(runtime)
    }

    /// All declared runtime versions, sorted by runtime name
    pub fn runtime_versions(&self) -> Vec<RuntimeVersion> {
        self.runtimes
            .iter()
            .map(|(runtime, version)| RuntimeVersion {
                runtime: runtime.clone(),
                version: version.clone(),
            })
            .collect()
    }
}
