//! Configuration document parsing and validation

use super::{ConfigModel, Settings, TargetRepository, DEFAULT_ANNOTATION_KEY, DEFAULT_BRANCH};
use crate::error::{Error, Result};
use crate::plan::{glob_matcher, is_glob};
use crate::rules::{DockerfileArgRule, UpdateRule, YamlAnnotationRule};
use crate::types::{Component, RepoId, Version};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Serialization format of a configuration document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML document
    Toml,
    /// YAML document
    Yaml,
}

impl ConfigFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            _ => Err(Error::Config(format!(
                "unsupported config format for {} (expected .toml, .yaml or .yml)",
                path.display()
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    settings: RawSettings,
    #[serde(alias = "rhoai-runtime-versions")]
    runtimes: RawRuntimes,
    #[serde(default)]
    repositories: Vec<RawRepository>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSettings {
    branch_prefix: Option<String>,
    fork: Option<bool>,
    fork_organization: Option<String>,
    author_name: Option<String>,
    author_email: Option<String>,
    max_parallel: Option<usize>,
    retry_attempts: Option<u32>,
    retry_base_delay_ms: Option<u64>,
}

/// Runtime versions, as a map or in the `[{runtime, version}]` list form
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRuntimes {
    Map(BTreeMap<String, String>),
    List(Vec<RawRuntimeEntry>),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRuntimeEntry {
    runtime: String,
    version: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRepository {
    repo: String,
    default_branch: Option<String>,
    component: Component,
    #[serde(default)]
    consolidate: bool,
    #[serde(default)]
    rules: Vec<RawRule>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", deny_unknown_fields)]
enum RawRule {
    DockerfileArg {
        path: String,
        arg: String,
        runtime: String,
    },
    YamlAnnotation {
        path: String,
        key: Option<String>,
        runtime: String,
    },
}

/// Load and validate a configuration file.
///
/// The format is chosen from the file extension.
pub fn load_config(path: &Path) -> Result<ConfigModel> {
    let format = ConfigFormat::from_path(path)?;
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
    debug!(path = %path.display(), ?format, "loading config");
    parse_config(&content, format)
}

/// Parse and validate a configuration document
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<ConfigModel> {
    let raw: RawConfig = match format {
        ConfigFormat::Toml => toml::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse config: {e}")))?,
        ConfigFormat::Yaml => serde_yaml::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse config: {e}")))?,
    };
    build_model(raw)
}

fn build_model(raw: RawConfig) -> Result<ConfigModel> {
    let settings = build_settings(raw.settings)?;
    let runtimes = build_runtimes(raw.runtimes)?;

    let mut seen = HashSet::new();
    let mut repositories = Vec::with_capacity(raw.repositories.len());
    for entry in raw.repositories {
        let repo: RepoId = entry.repo.parse()?;
        if !seen.insert(repo.clone()) {
            return Err(Error::Config(format!("repository {repo} is declared twice")));
        }
        if entry.rules.is_empty() {
            return Err(Error::Config(format!("repository {repo} declares no rules")));
        }

        let rules = entry
            .rules
            .into_iter()
            .map(|rule| build_rule(&repo, rule, &runtimes))
            .collect::<Result<Vec<_>>>()?;

        let default_branch = entry
            .default_branch
            .unwrap_or_else(|| DEFAULT_BRANCH.to_string());
        require_non_empty(&default_branch, || format!("{repo}: default_branch"))?;

        repositories.push(TargetRepository {
            repo,
            default_branch,
            component: entry.component,
            consolidate: entry.consolidate,
            rules,
        });
    }

    debug!(
        runtimes = runtimes.len(),
        repositories = repositories.len(),
        "config loaded"
    );

    Ok(ConfigModel {
        runtimes,
        repositories,
        settings,
    })
}

fn build_settings(raw: RawSettings) -> Result<Settings> {
    let defaults = Settings::default();
    let settings = Settings {
        branch_prefix: raw.branch_prefix.unwrap_or(defaults.branch_prefix),
        fork: raw.fork.unwrap_or(defaults.fork),
        fork_organization: raw.fork_organization,
        author_name: raw.author_name.unwrap_or(defaults.author_name),
        author_email: raw.author_email.unwrap_or(defaults.author_email),
        max_parallel: raw.max_parallel.unwrap_or(defaults.max_parallel),
        retry_attempts: raw.retry_attempts.unwrap_or(defaults.retry_attempts),
        retry_base_delay_ms: raw.retry_base_delay_ms.unwrap_or(defaults.retry_base_delay_ms),
    };

    require_non_empty(&settings.branch_prefix, || "settings.branch_prefix".to_string())?;
    if settings.branch_prefix.contains(char::is_whitespace) {
        return Err(Error::Config(
            "settings.branch_prefix must not contain whitespace".to_string(),
        ));
    }
    if settings.max_parallel == 0 {
        return Err(Error::Config("settings.max_parallel must be at least 1".to_string()));
    }
    if settings.retry_attempts == 0 {
        return Err(Error::Config("settings.retry_attempts must be at least 1".to_string()));
    }
    Ok(settings)
}

fn build_runtimes(raw: RawRuntimes) -> Result<BTreeMap<String, Version>> {
    let pairs: Vec<(String, String)> = match raw {
        RawRuntimes::Map(map) => map.into_iter().collect(),
        RawRuntimes::List(list) => list.into_iter().map(|e| (e.runtime, e.version)).collect(),
    };

    let mut runtimes = BTreeMap::new();
    for (runtime, version) in pairs {
        require_non_empty(&runtime, || "runtime name".to_string())?;
        let version = Version::parse(version.trim()).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("runtime {runtime}: {msg}")),
            other => other,
        })?;
        if runtimes.insert(runtime.clone(), version).is_some() {
            return Err(Error::Config(format!("runtime {runtime} is declared twice")));
        }
    }
    Ok(runtimes)
}

fn build_rule(
    repo: &RepoId,
    raw: RawRule,
    runtimes: &BTreeMap<String, Version>,
) -> Result<UpdateRule> {
    let rule = match raw {
        RawRule::DockerfileArg { path, arg, runtime } => {
            require_non_empty(&arg, || format!("{repo}: rule arg"))?;
            UpdateRule::DockerfileArg(DockerfileArgRule::new(path, arg, runtime))
        }
        RawRule::YamlAnnotation { path, key, runtime } => {
            let key = key.unwrap_or_else(|| DEFAULT_ANNOTATION_KEY.to_string());
            require_non_empty(&key, || format!("{repo}: rule key"))?;
            UpdateRule::YamlAnnotation(YamlAnnotationRule::new(path, key, runtime))
        }
    };

    require_non_empty(rule.path(), || format!("{repo}: rule path"))?;
    if is_glob(rule.path()) {
        glob_matcher(rule.path()).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{repo}: {msg}")),
            other => other,
        })?;
    }
    if !runtimes.contains_key(rule.runtime()) {
        return Err(Error::Config(format!(
            "{repo}: rule {rule} in {} references undeclared runtime '{}'",
            rule.path(),
            rule.runtime()
        )));
    }
    Ok(rule)
}

fn require_non_empty(value: &str, what: impl FnOnce() -> String) -> Result<()> {
    if value.trim().is_empty() {
        Err(Error::Config(format!("{} must not be empty", what())))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"
[runtimes]
vllm = "0.8.1"

[[repositories]]
repo = "red-hat-data-services/vllm"
component = "vllm"

[[repositories.rules]]
type = "dockerfile-arg"
path = "Dockerfile.ubi"
arg = "VLLM_VERSION"
runtime = "vllm"
"#;

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let model = parse_config(MINIMAL, ConfigFormat::Toml).unwrap();
        assert_eq!(model.settings, Settings::default());
        assert_eq!(model.repositories.len(), 1);
        assert_eq!(model.repositories[0].default_branch, "main");
        assert!(!model.repositories[0].consolidate);
        assert_eq!(model.version_of("vllm").unwrap().as_str(), "0.8.1");
    }

    #[test]
    fn test_equal_inputs_equal_models() {
        let a = parse_config(MINIMAL, ConfigFormat::Toml).unwrap();
        let b = parse_config(MINIMAL, ConfigFormat::Toml).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_yaml_list_form_alias() {
        let yaml = r#"
rhoai-runtime-versions:
  - runtime: vllm-rocm
    version: "0.8.2"
repositories:
  - repo: github.com/red-hat-data-services/odh-model-controller
    component: odh-controller
    consolidate: true
    rules:
      - type: yaml-annotation
        path: config/runtimes/vllm-rocm-template.yaml
        runtime: vllm-rocm
"#;
        let model = parse_config(yaml, ConfigFormat::Yaml).unwrap();
        let repo = &model.repositories[0];
        assert!(repo.consolidate);
        assert_eq!(repo.component, Component::OdhController);
        assert_eq!(repo.rules[0].key(), DEFAULT_ANNOTATION_KEY);
    }

    #[test]
    fn test_unknown_runtime_binding_is_error() {
        let bad = MINIMAL.replace("runtime = \"vllm\"", "runtime = \"vllm-tpu\"");
        let err = parse_config(&bad, ConfigFormat::Toml).unwrap_err();
        assert!(err.to_string().contains("undeclared runtime 'vllm-tpu'"), "{err}");
    }

    #[test]
    fn test_malformed_version_is_error() {
        let bad = MINIMAL.replace("\"0.8.1\"", "\"latest\"");
        let err = parse_config(&bad, ConfigFormat::Toml).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("runtime vllm")), "{err}");
    }

    #[test]
    fn test_invalid_glob_path_is_error() {
        let bad = MINIMAL.replace("\"Dockerfile.ubi\"", "\"Dockerfile.[*\"");
        let err = parse_config(&bad, ConfigFormat::Toml).unwrap_err();
        assert!(
            matches!(err, Error::Config(ref m) if m.contains("invalid glob 'Dockerfile.[*'")),
            "{err}"
        );
    }

    #[test]
    fn test_zero_rules_is_error() {
        let toml = "[runtimes]\nvllm = \"0.8.1\"\n[[repositories]]\nrepo = \"o/r\"\ncomponent = \"vllm\"\n";
        let err = parse_config(toml, ConfigFormat::Toml).unwrap_err();
        assert!(err.to_string().contains("declares no rules"));
    }

    #[test]
    fn test_duplicate_repository_is_error() {
        let dup = format!(
            "{MINIMAL}\n[[repositories]]\nrepo = \"github.com/red-hat-data-services/vllm\"\ncomponent = \"vllm\"\n[[repositories.rules]]\ntype = \"dockerfile-arg\"\npath = \"Dockerfile\"\narg = \"X\"\nruntime = \"vllm\"\n"
        );
        let err = parse_config(&dup, ConfigFormat::Toml).unwrap_err();
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn test_unknown_field_is_error() {
        let bad = MINIMAL.replace("component = \"vllm\"", "component = \"vllm\"\nowner = \"x\"");
        assert!(parse_config(&bad, ConfigFormat::Toml).is_err());
    }

    #[test]
    fn test_zero_parallelism_is_error() {
        let bad = format!("[settings]\nmax_parallel = 0\n{MINIMAL}");
        assert!(parse_config(&bad, ConfigFormat::Toml).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("fleet.toml");
        fs::write(&path, MINIMAL).unwrap();
        assert!(load_config(&path).is_ok());

        let json = temp.path().join("fleet.json");
        fs::write(&json, "{}").unwrap();
        assert!(matches!(load_config(&json), Err(Error::Config(_))));
    }
}
