//! `ARG <NAME>="<version>"` build-arg declarations

use super::{parse_value, rewrite_lines, NotFound, Rewrite, ValueSpan};
use crate::types::Version;
use regex::Regex;

/// Rewrites the default value of a build-arg in a container build file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerfileArgRule {
    /// File path (or glob) relative to the repository root
    pub path: String,
    /// Build-arg name (e.g. `VLLM_VERSION`)
    pub arg: String,
    /// Runtime the rule is bound to
    pub runtime: String,
}

impl DockerfileArgRule {
    /// Create a rule
    pub fn new(path: impl Into<String>, arg: impl Into<String>, runtime: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            arg: arg.into(),
            runtime: runtime.into(),
        }
    }

    fn pattern(&self) -> Regex {
        // Instruction keywords are case-insensitive, arg names are not
        Regex::new(&format!(r"^\s*(?i:arg)\s+{}\s*=\s*", regex::escape(&self.arg)))
            .expect("escaped arg name always forms a valid pattern")
    }

    /// Rewrite every `ARG` line carrying a default for this arg.
    ///
    /// The new value is always written double-quoted. `ARG NAME` without a
    /// default is a re-declaration and is not a match.
    pub fn apply(&self, content: &str, version: &Version) -> Result<Rewrite, NotFound> {
        let pattern = self.pattern();
        rewrite_lines(
            content,
            version,
            |line| {
                let prefix = pattern.find(line)?;
                parse_value(line, prefix.end(), false)
            },
            |_: &ValueSpan, v: &Version| format!("\"{v}\""),
        )
        .ok_or_else(|| NotFound {
            rule: format!("ARG {}", self.arg),
        })
    }
}
