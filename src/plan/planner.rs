//! Change planning - pure functions for computing change sets
//!
//! This module contains the pure, testable logic for deciding what to change.
//! No I/O happens here beyond reading through a [`ContentSource`], making it
//! easy to unit test against in-memory snapshots.

use super::source::{resolve_paths, ContentSource};
use crate::config::{ConfigModel, Settings, TargetRepository};
use crate::error::{Error, Result};
use crate::rules::{RuleKind, UpdateRule};
use crate::types::{Component, RepoId};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::BuildHasher;
use std::str::FromStr;
use tracing::debug;

/// Runtime selection for a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RuntimeFilter {
    /// Every declared runtime
    #[default]
    All,
    /// A single runtime by name
    Only(String),
}

impl RuntimeFilter {
    /// Whether a runtime passes the filter
    pub fn matches(&self, runtime: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(name) => name == runtime,
        }
    }
}

impl FromStr for RuntimeFilter {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim() {
            "" | "all" => Ok(Self::All),
            name => Ok(Self::Only(name.to_string())),
        }
    }
}

impl fmt::Display for RuntimeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Only(name) => write!(f, "{name}"),
        }
    }
}

/// Component selection for a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ComponentFilter {
    /// VLLM-family repositories only
    Vllm,
    /// The model-controller repository only
    OdhController,
    /// Everything
    #[default]
    Both,
}

impl ComponentFilter {
    /// Whether a component passes the filter
    pub fn matches(self, component: Component) -> bool {
        match self {
            Self::Both => true,
            Self::Vllm => component == Component::Vllm,
            Self::OdhController => component == Component::OdhController,
        }
    }
}

impl FromStr for ComponentFilter {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "vllm" => Ok(Self::Vllm),
            "odh-controller" | "odh" => Ok(Self::OdhController),
            "both" | "all" => Ok(Self::Both),
            other => Err(Error::Config(format!(
                "unknown component '{other}' (expected vllm, odh-controller or both)"
            ))),
        }
    }
}

impl fmt::Display for ComponentFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vllm => write!(f, "vllm"),
            Self::OdhController => write!(f, "odh-controller"),
            Self::Both => write!(f, "both"),
        }
    }
}

/// Which repositories and rules a run covers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFilter {
    /// Runtime selection
    pub runtime: RuntimeFilter,
    /// Component selection
    pub component: ComponentFilter,
    /// Base branch override (repository default branch when `None`)
    pub base_branch: Option<String>,
}

impl RunFilter {
    /// Reject filters that name runtimes the config does not declare
    pub fn validate(&self, config: &ConfigModel) -> Result<()> {
        if let RuntimeFilter::Only(name) = &self.runtime
            && config.version_of(name).is_none()
        {
            return Err(Error::Config(format!(
                "runtime filter '{name}' is not declared in the config"
            )));
        }
        Ok(())
    }

    /// Whether a rule passes the runtime filter
    pub fn selects_rule(&self, rule: &UpdateRule) -> bool {
        self.runtime.matches(rule.runtime())
    }

    /// Whether a repository has anything to do under this filter
    pub fn selects_repository(&self, target: &TargetRepository) -> bool {
        self.component.matches(target.component)
            && target.rules.iter().any(|r| self.selects_rule(r))
    }

    /// Base branch for a repository
    pub fn base_branch_for<'a>(&'a self, target: &'a TargetRepository) -> &'a str {
        self.base_branch.as_deref().unwrap_or(&target.default_branch)
    }
}

/// One value rewrite inside one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    /// Repository the file belongs to
    pub repo: RepoId,
    /// Repository-relative file path
    pub path: String,
    /// 1-based line number
    pub line: usize,
    /// Literal value before the change
    pub old: String,
    /// Literal value after the change
    pub new: String,
    /// Runtime the producing rule is bound to
    pub runtime: String,
    /// Rule family
    pub kind: RuleKind,
    /// Build-arg name or annotation key
    pub key: String,
}

/// Final content of a file touched by a change set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEdit {
    /// Repository-relative file path
    pub path: String,
    /// Full new content
    pub content: String,
}

/// A rule whose pattern is no longer present (configuration drift)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Drift {
    /// File path (or glob) that was searched
    pub path: String,
    /// Rule label
    pub rule: String,
}

/// Everything that should change in one repository
///
/// A change set with no records is a valid, inert outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    /// Target repository
    pub repo: RepoId,
    /// Component family
    pub component: Component,
    /// Branch the changes are based on and the PR targets
    pub base_branch: String,
    /// Automation-owned branch carrying the changes
    pub head_branch: String,
    /// Whether changes are rendered as one consolidated PR
    pub consolidated: bool,
    /// Value rewrites in rule-declaration order
    pub records: Vec<ChangeRecord>,
    /// New content per touched file, in first-touched order
    pub files: Vec<FileEdit>,
    /// Rules whose pattern was not found
    pub drift: Vec<Drift>,
}

impl ChangeSet {
    /// An inert change set for `target` under `filter`
    pub fn new(settings: &Settings, target: &TargetRepository, filter: &RunFilter) -> Self {
        let base_branch = filter.base_branch_for(target);
        Self {
            repo: target.repo.clone(),
            component: target.component,
            base_branch: base_branch.to_string(),
            head_branch: head_branch_name(settings, base_branch, &filter.runtime),
            consolidated: target.consolidate,
            records: Vec::new(),
            files: Vec::new(),
            drift: Vec::new(),
        }
    }

    /// Whether there is nothing to change
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether any rule drifted
    pub fn has_drift(&self) -> bool {
        !self.drift.is_empty()
    }

    /// Drift reports as errors
    pub fn drift_errors(&self) -> Vec<Error> {
        self.drift
            .iter()
            .map(|d| Error::RuleNotFound {
                repo: self.repo.to_string(),
                path: d.path.clone(),
                rule: d.rule.clone(),
            })
            .collect()
    }

    /// Distinct `(runtime, new version)` pairs, in record order
    pub fn runtime_updates(&self) -> Vec<(&str, &str)> {
        let mut updates: Vec<(&str, &str)> = Vec::new();
        for record in &self.records {
            let pair = (record.runtime.as_str(), record.new.as_str());
            if !updates.contains(&pair) {
                updates.push(pair);
            }
        }
        updates
    }

    /// Distinct touched paths, in record order
    pub fn touched_paths(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.path.as_str()).collect()
    }
}

/// Automation-owned head branch for a base branch.
///
/// Stable across runs so a later bump refreshes the same pull request. A
/// single-runtime run uses `<prefix>-<runtime>/<base>` so it never rewrites
/// the branch carrying another runtime's pending bump.
pub fn head_branch_name(
    settings: &Settings,
    base_branch: &str,
    runtime: &RuntimeFilter,
) -> String {
    match runtime {
        RuntimeFilter::All => format!("{}/{}", settings.branch_prefix, base_branch),
        RuntimeFilter::Only(name) => {
            format!("{}-{name}/{}", settings.branch_prefix, base_branch)
        }
    }
}

/// Repositories covered by a filter, in declared order
pub fn select_repositories<'a>(
    config: &'a ConfigModel,
    filter: &RunFilter,
) -> Vec<&'a TargetRepository> {
    config
        .repositories
        .iter()
        .filter(|t| filter.selects_repository(t))
        .collect()
}

/// Plan one repository (PURE apart from reads through `source`)
///
/// Applies every rule that passes the filter, in declared order, chaining
/// rules that touch the same file. Returns `None` when no rule passes.
pub fn plan_repository(
    config: &ConfigModel,
    target: &TargetRepository,
    filter: &RunFilter,
    source: &dyn ContentSource,
) -> Result<Option<ChangeSet>> {
    if !filter.selects_repository(target) {
        return Ok(None);
    }

    let mut current: BTreeMap<String, String> = BTreeMap::new();
    let mut touched: Vec<String> = Vec::new();
    let mut records = Vec::new();
    let mut drift = Vec::new();

    for rule in target.rules.iter().filter(|r| filter.selects_rule(r)) {
        let version = config.version_of(rule.runtime()).ok_or_else(|| {
            Error::Config(format!(
                "{}: rule {rule} references undeclared runtime '{}'",
                target.repo,
                rule.runtime()
            ))
        })?;

        let paths = resolve_paths(source, rule.path())?;
        if paths.is_empty() {
            drift.push(Drift {
                path: rule.path().to_string(),
                rule: rule.to_string(),
            });
            continue;
        }

        for path in paths {
            let content = match current.get(&path) {
                Some(content) => content.clone(),
                None => match source.read_file(&path)? {
                    Some(content) => content,
                    None => {
                        drift.push(Drift {
                            path,
                            rule: rule.to_string(),
                        });
                        continue;
                    }
                },
            };

            let rewrite = match rule.apply(&content, version) {
                Ok(rewrite) => rewrite,
                Err(not_found) => {
                    drift.push(Drift {
                        path,
                        rule: not_found.rule,
                    });
                    continue;
                }
            };

            if rewrite.is_unchanged() {
                continue;
            }

            records.extend(rewrite.edits.into_iter().map(|edit| ChangeRecord {
                repo: target.repo.clone(),
                path: path.clone(),
                line: edit.line,
                old: edit.old,
                new: edit.new,
                runtime: rule.runtime().to_string(),
                kind: rule.kind(),
                key: rule.key().to_string(),
            }));
            if !touched.contains(&path) {
                touched.push(path.clone());
            }
            current.insert(path, rewrite.content);
        }
    }

    let files = touched
        .into_iter()
        .filter_map(|path| {
            current
                .remove(&path)
                .map(|content| FileEdit { path, content })
        })
        .collect();

    let change_set = ChangeSet {
        records,
        files,
        drift,
        ..ChangeSet::new(&config.settings, target, filter)
    };

    debug!(
        repo = %change_set.repo,
        records = change_set.records.len(),
        drift = change_set.drift.len(),
        "planned repository"
    );
    Ok(Some(change_set))
}

/// Plan every selected repository (PURE apart from reads through `sources`)
///
/// Repositories are processed in declared order. Every selected repository
/// must have a snapshot in `sources`.
pub fn plan<S: ContentSource, H: BuildHasher>(
    config: &ConfigModel,
    filter: &RunFilter,
    sources: &HashMap<RepoId, S, H>,
) -> Result<Vec<ChangeSet>> {
    filter.validate(config)?;

    let mut change_sets = Vec::new();
    for target in select_repositories(config, filter) {
        let source = sources.get(&target.repo).ok_or_else(|| {
            Error::Internal(format!("no content snapshot for {}", target.repo))
        })?;
        if let Some(change_set) = plan_repository(config, target, filter, source)? {
            change_sets.push(change_set);
        }
    }
    Ok(change_sets)
}
