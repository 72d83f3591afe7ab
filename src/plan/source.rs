//! Read-only access to a repository snapshot

use crate::error::{Error, Result};
use globset::{GlobBuilder, GlobMatcher};
use std::collections::BTreeMap;

/// Read-only view of one repository's files at the base branch.
///
/// Planning only ever reads through this trait, so it can run against an
/// in-memory snapshot in tests and against a local checkout in production.
pub trait ContentSource {
    /// Read a file by repository-relative path (`None` if it does not exist)
    fn read_file(&self, path: &str) -> Result<Option<String>>;

    /// List every file as a `/`-separated repository-relative path
    fn list_files(&self) -> Result<Vec<String>>;
}

/// In-memory snapshot, keyed by repository-relative path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySource {
    files: BTreeMap<String, String>,
}

impl MemorySource {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file (builder style)
    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Add or replace a file
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }
}

impl ContentSource for MemorySource {
    fn read_file(&self, path: &str) -> Result<Option<String>> {
        Ok(self.files.get(path).cloned())
    }

    fn list_files(&self) -> Result<Vec<String>> {
        Ok(self.files.keys().cloned().collect())
    }
}

/// Whether a rule path needs glob expansion
pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

/// Compile a rule glob; `*` does not cross directory separators
pub fn glob_matcher(pattern: &str) -> Result<GlobMatcher> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|e| Error::Config(format!("invalid glob '{pattern}': {e}")))
}

/// Expand a rule path into concrete file paths, sorted.
///
/// Literal paths are returned as-is (existence is checked on read); glob
/// patterns are matched against the full file list with `*` not crossing
/// directory separators.
pub fn resolve_paths(source: &dyn ContentSource, pattern: &str) -> Result<Vec<String>> {
    if !is_glob(pattern) {
        return Ok(vec![pattern.to_string()]);
    }

    let matcher = glob_matcher(pattern)?;

    let mut paths: Vec<String> = source
        .list_files()?
        .into_iter()
        .filter(|p| matcher.is_match(p))
        .collect();
    paths.sort();
    Ok(paths)
}
