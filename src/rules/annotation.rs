//! `<key>: <version>` annotation fields in template documents

use super::{parse_value, rewrite_lines, NotFound, Rewrite, ValueSpan};
use crate::types::Version;
use regex::Regex;

/// Rewrites an annotation value wherever the key appears in a file.
///
/// A template file may hold several documents (or one template embedding
/// several objects), so every occurrence of the key is a separate location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YamlAnnotationRule {
    /// File path or glob relative to the repository root
    pub path: String,
    /// Annotation key (e.g. `opendatahub.io/runtime-version`)
    pub key: String,
    /// Runtime the rule is bound to
    pub runtime: String,
}

impl YamlAnnotationRule {
    /// Create a rule
    pub fn new(path: impl Into<String>, key: impl Into<String>, runtime: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
            runtime: runtime.into(),
        }
    }

    fn pattern(&self) -> Regex {
        let key = regex::escape(&self.key);
        Regex::new(&format!(
            r#"^\s*(?:-\s+)?(?:{key}|"{key}"|'{key}')\s*:[ \t]*"#
        ))
        .expect("escaped annotation key always forms a valid pattern")
    }

    /// Rewrite every occurrence of the annotation, keeping its quote style
    pub fn apply(&self, content: &str, version: &Version) -> Result<Rewrite, NotFound> {
        let pattern = self.pattern();
        rewrite_lines(
            content,
            version,
            |line| {
                let prefix = pattern.find(line)?;
                parse_value(line, prefix.end(), true)
            },
            |span: &ValueSpan, v: &Version| match span.quote {
                Some(q) => format!("{q}{v}{q}"),
                None => v.to_string(),
            },
        )
        .ok_or_else(|| NotFound {
            rule: format!("annotation {}", self.key),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_ANNOTATION_KEY;

    fn rule() -> YamlAnnotationRule {
        YamlAnnotationRule::new("config/runtimes/vllm-cuda-template.yaml", DEFAULT_ANNOTATION_KEY, "vllm")
    }

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    const TEMPLATE: &str = "\
apiVersion: template.openshift.io/v1
kind: Template
objects:
  - apiVersion: serving.kserve.io/v1alpha1
    kind: ServingRuntime
    metadata:
      name: vllm-cuda-runtime
      annotations:
        openshift.io/display-name: vLLM NVIDIA GPU ServingRuntime for KServe
        opendatahub.io/runtime-version: 'v0.8.0' # keep in sync
        opendatahub.io/recommended-accelerators: '[\"nvidia.com/gpu\"]'
";

    #[test]
    fn test_keeps_quote_style_and_comment() {
        let rewrite = rule().apply(TEMPLATE, &v("v0.8.1")).unwrap();
        assert_eq!(rewrite.edits.len(), 1);
        assert_eq!(rewrite.edits[0].line, 10);
        assert_eq!(rewrite.edits[0].old, "v0.8.0");
        assert_eq!(
            rewrite.content,
            TEMPLATE.replace("'v0.8.0' # keep in sync", "'v0.8.1' # keep in sync")
        );
    }

    #[test]
    fn test_multiple_documents_each_recorded() {
        let content = "\
---
metadata:
  annotations:
    opendatahub.io/runtime-version: v0.7.0
---
metadata:
  annotations:
    opendatahub.io/runtime-version: \"v0.7.0\"
---
metadata:
  annotations:
    opendatahub.io/runtime-version: v0.8.1
";
        let rewrite = rule().apply(content, &v("v0.8.1")).unwrap();
        let lines: Vec<_> = rewrite.edits.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![4, 8]);
        assert!(rewrite.content.contains("runtime-version: v0.8.1\n---"));
        assert!(rewrite.content.contains("runtime-version: \"v0.8.1\"\n"));
    }

    #[test]
    fn test_missing_key_is_not_found() {
        let err = rule()
            .apply("metadata:\n  annotations:\n    other: x\n", &v("0.8.1"))
            .unwrap_err();
        assert_eq!(err.rule, "annotation opendatahub.io/runtime-version");
    }

    #[test]
    fn test_key_prefix_does_not_match_longer_key() {
        let content = "opendatahub.io/runtime-version-extra: 1.0.0\n";
        assert!(rule().apply(content, &v("1.0.1")).is_err());
    }

    #[test]
    fn test_quoted_key() {
        let content = "  \"opendatahub.io/runtime-version\": \"1.0.0\"\n";
        let rewrite = rule().apply(content, &v("1.1.0")).unwrap();
        assert_eq!(rewrite.content, "  \"opendatahub.io/runtime-version\": \"1.1.0\"\n");
    }
}
