//! Version pattern rules
//!
//! A rule locates the line(s) of a file that encode a runtime version and
//! rewrites only the value bytes. Matching is textual on purpose: surrounding
//! formatting, comments and line endings are preserved exactly, so a version
//! bump shows up as a single-line change per location.

mod annotation;
mod dockerfile;

pub use annotation::YamlAnnotationRule;
pub use dockerfile::DockerfileArgRule;

use crate::types::Version;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// The rule's pattern does not occur in the content
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{rule} not found")]
pub struct NotFound {
    /// Label of the rule that failed to match
    pub rule: String,
}

/// One rewritten location
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineEdit {
    /// 1-based line number
    pub line: usize,
    /// Value before the rewrite
    pub old: String,
    /// Value after the rewrite
    pub new: String,
}

/// Result of applying a rule to a file's content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    /// Content after the rewrite (identical to the input when `edits` is empty)
    pub content: String,
    /// Locations whose value changed
    pub edits: Vec<LineEdit>,
}

impl Rewrite {
    /// Whether the content already carries the desired version everywhere
    pub fn is_unchanged(&self) -> bool {
        self.edits.is_empty()
    }
}

/// Rule family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    /// `ARG <NAME>="<version>"` in a container build file
    DockerfileArg,
    /// `<key>: <version>` in a templated manifest
    YamlAnnotation,
}

/// A single update rule bound to one runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateRule {
    /// Build-arg declaration in a container build file
    DockerfileArg(DockerfileArgRule),
    /// Annotation field in template documents
    YamlAnnotation(YamlAnnotationRule),
}

impl UpdateRule {
    /// Rule family
    pub const fn kind(&self) -> RuleKind {
        match self {
            Self::DockerfileArg(_) => RuleKind::DockerfileArg,
            Self::YamlAnnotation(_) => RuleKind::YamlAnnotation,
        }
    }

    /// File path or glob the rule applies to
    pub fn path(&self) -> &str {
        match self {
            Self::DockerfileArg(r) => &r.path,
            Self::YamlAnnotation(r) => &r.path,
        }
    }

    /// Runtime the rule is bound to
    pub fn runtime(&self) -> &str {
        match self {
            Self::DockerfileArg(r) => &r.runtime,
            Self::YamlAnnotation(r) => &r.runtime,
        }
    }

    /// Build-arg name or annotation key
    pub fn key(&self) -> &str {
        match self {
            Self::DockerfileArg(r) => &r.arg,
            Self::YamlAnnotation(r) => &r.key,
        }
    }

    /// Rewrite `content` so the rule's value equals `version`
    pub fn apply(&self, content: &str, version: &Version) -> Result<Rewrite, NotFound> {
        match self {
            Self::DockerfileArg(r) => r.apply(content, version),
            Self::YamlAnnotation(r) => r.apply(content, version),
        }
    }
}

impl fmt::Display for UpdateRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DockerfileArg(r) => write!(f, "ARG {}", r.arg),
            Self::YamlAnnotation(r) => write!(f, "annotation {}", r.key),
        }
    }
}

/// Location of a value within one line (without its terminator)
#[derive(Debug, Clone, PartialEq, Eq)]
struct ValueSpan {
    /// Byte offset where the replaced region starts (opening quote included)
    start: usize,
    /// Byte offset where the replaced region ends (closing quote included)
    end: usize,
    /// Quote character around the value, if any
    quote: Option<char>,
    /// Unquoted value text
    value: String,
}

/// Parse the value starting at `offset` of `line`.
///
/// Quoted values must be closed; anything after the value must be
/// whitespace, or a `#` comment when `allow_comment` is set.
fn parse_value(line: &str, offset: usize, allow_comment: bool) -> Option<ValueSpan> {
    let rest = &line[offset..];
    let tail_ok = |tail: &str| {
        let tail = tail.trim_start();
        tail.is_empty() || (allow_comment && tail.starts_with('#'))
    };

    let first = rest.chars().next()?;
    if first == '"' || first == '\'' {
        let close = rest[1..].find(first)?;
        let value = &rest[1..=close];
        let end = offset + close + 2;
        if value.is_empty() || !tail_ok(&line[end..]) {
            return None;
        }
        return Some(ValueSpan {
            start: offset,
            end,
            quote: Some(first),
            value: value.to_string(),
        });
    }

    let raw = if allow_comment {
        rest.find(" #").map_or(rest, |idx| &rest[..idx])
    } else {
        rest
    };
    let value = raw.trim_end();
    if value.is_empty() || value.contains(['"', '\'']) || value.contains(char::is_whitespace) {
        return None;
    }
    Some(ValueSpan {
        start: offset,
        end: offset + value.len(),
        quote: None,
        value: value.to_string(),
    })
}

/// Apply `locate`/`render` to every line of `content`.
///
/// Returns `None` when no line matched at all. Lines whose value already
/// equals `version` are left byte-for-byte untouched.
fn rewrite_lines<L, R>(content: &str, version: &Version, locate: L, render: R) -> Option<Rewrite>
where
    L: Fn(&str) -> Option<ValueSpan>,
    R: Fn(&ValueSpan, &Version) -> String,
{
    let mut out = String::with_capacity(content.len() + 16);
    let mut edits = Vec::new();
    let mut found = false;

    for (idx, raw_line) in content.split_inclusive('\n').enumerate() {
        let body_len = raw_line.trim_end_matches(['\n', '\r']).len();
        let (body, terminator) = raw_line.split_at(body_len);

        let Some(span) = locate(body) else {
            out.push_str(raw_line);
            continue;
        };
        found = true;

        if span.value == version.as_str() {
            out.push_str(raw_line);
            continue;
        }

        out.push_str(&body[..span.start]);
        out.push_str(&render(&span, version));
        out.push_str(&body[span.end..]);
        out.push_str(terminator);
        edits.push(LineEdit {
            line: idx + 1,
            old: span.value,
            new: version.to_string(),
        });
    }

    found.then_some(Rewrite {
        content: out,
        edits,
    })
}
