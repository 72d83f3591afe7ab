//! Shared test utilities

#![allow(dead_code)]

mod mock_gateway;
mod mock_host;

pub use mock_gateway::{CommitCall, MockGateway, PushCall};
pub use mock_host::{MockHost, UpdatePrCall};

use runtime_bump::config::{ConfigFormat, ConfigModel, parse_config};
use runtime_bump::types::{PrState, PullRequest, RepoId};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Configuration covering both component families.
///
/// Retries are fast so transient-failure tests do not sleep.
pub const FLEET_TOML: &str = r#"
[settings]
max_parallel = 2
retry_attempts = 3
retry_base_delay_ms = 1

[runtimes]
vllm = "0.8.1"
vllm-cpu = "0.8.1"
vllm-rocm = "0.8.1"

[[repositories]]
repo = "github.com/org/vllm"
component = "vllm"
  [[repositories.rules]]
  type = "dockerfile-arg"
  path = "Dockerfile.ubi"
  arg = "VLLM_VERSION"
  runtime = "vllm"

[[repositories]]
repo = "github.com/org/vllm-cpu"
component = "vllm"
  [[repositories.rules]]
  type = "dockerfile-arg"
  path = "Dockerfile.ppc64le.ubi"
  arg = "VLLM_VERSION"
  runtime = "vllm-cpu"
  [[repositories.rules]]
  type = "dockerfile-arg"
  path = "Dockerfile.s390x.ubi"
  arg = "VLLM_VERSION"
  runtime = "vllm-cpu"

[[repositories]]
repo = "github.com/org/odh-model-controller"
component = "odh-controller"
consolidate = true
  [[repositories.rules]]
  type = "yaml-annotation"
  path = "config/runtimes/vllm-cuda-template.yaml"
  runtime = "vllm"
  [[repositories.rules]]
  type = "yaml-annotation"
  path = "config/runtimes/vllm-rocm-*-template.yaml"
  runtime = "vllm-rocm"
"#;

/// Parse a TOML configuration
pub fn config(toml: &str) -> ConfigModel {
    parse_config(toml, ConfigFormat::Toml).expect("test config should parse")
}

/// The fleet configuration
pub fn fleet() -> ConfigModel {
    config(FLEET_TOML)
}

/// `github.com/org/<name>`
pub fn repo(name: &str) -> RepoId {
    RepoId::new("github.com", "org", name)
}

/// A container build file pinning `version`
pub fn dockerfile(version: &str) -> String {
    format!(
        "FROM registry.access.redhat.com/ubi9/ubi-minimal AS base\n\
         ARG PYTHON_VERSION=3.12\n\
         ARG VLLM_VERSION=\"{version}\"\n\
         RUN pip install vllm==${{VLLM_VERSION}}\n"
    )
}

/// A serving-runtime template annotated with `version`
pub fn template(name: &str, version: &str) -> String {
    format!(
        "apiVersion: template.openshift.io/v1\n\
         kind: Template\n\
         metadata:\n  name: {name}\n\
         objects:\n\
         - apiVersion: serving.kserve.io/v1alpha1\n\
         \x20 kind: ServingRuntime\n\
         \x20 metadata:\n\
         \x20   annotations:\n\
         \x20     opendatahub.io/runtime-version: '{version}'\n\
         \x20     openshift.io/display-name: {name}\n"
    )
}

/// Seed `gateway` with the fleet's files, all pinned to `version`
pub fn seed_fleet(gateway: &MockGateway, version: &str) {
    gateway.add_file(&repo("vllm"), "Dockerfile.ubi", &dockerfile(version));
    gateway.add_file(&repo("vllm-cpu"), "Dockerfile.ppc64le.ubi", &dockerfile(version));
    gateway.add_file(&repo("vllm-cpu"), "Dockerfile.s390x.ubi", &dockerfile(version));
    let odh = repo("odh-model-controller");
    for name in [
        "vllm-cuda-template",
        "vllm-rocm-a-template",
        "vllm-rocm-b-template",
        "vllm-rocm-c-template",
    ] {
        gateway.add_file(
            &odh,
            &format!("config/runtimes/{name}.yaml"),
            &template(name, version),
        );
    }
    gateway.add_file(&odh, "README.md", "# controller\n");
}

/// Helper to create a `PullRequest`
pub fn make_pr(number: u64, head: &str, state: PrState, author: &str) -> PullRequest {
    PullRequest {
        number,
        html_url: format!("https://github.com/org/repo/pull/{number}"),
        base_ref: "main".to_string(),
        head_ref: head.to_string(),
        title: "Old title".to_string(),
        body: Some("Old body".to_string()),
        state,
        author: Some(author.to_string()),
    }
}

/// Run git, panicking on failure
pub fn git(cwd: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .env("GIT_AUTHOR_NAME", "Test")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "Test")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .output()
        .expect("git should run");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Bare git repositories served from a temp dir as `file://<root>/<owner>/<name>.git`
pub struct LocalRemotes {
    root: TempDir,
}

impl LocalRemotes {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().expect("create temp dir"),
        }
    }

    /// Value for `GitGateway::with_remote_base`
    pub fn base(&self) -> String {
        format!("file://{}", self.root.path().display())
    }

    fn bare_path(&self, repo: &RepoId) -> PathBuf {
        self.root
            .path()
            .join(&repo.owner)
            .join(format!("{}.git", repo.name))
    }

    /// Create a bare repository whose `main` holds `files`
    pub fn create(&self, repo: &RepoId, files: &[(&str, &str)]) {
        let bare = self.bare_path(repo);
        std::fs::create_dir_all(&bare).expect("create bare dir");
        git(&bare, &["init", "--bare", "--quiet", "--initial-branch=main"]);

        let work = TempDir::new().expect("create work dir");
        git(work.path(), &["init", "--quiet", "--initial-branch=main"]);
        for (path, content) in files {
            let full = work.path().join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, content).unwrap();
        }
        git(work.path(), &["add", "."]);
        git(work.path(), &["commit", "--quiet", "-m", "initial"]);
        git(
            work.path(),
            &["push", "--quiet", bare.to_str().unwrap(), "main"],
        );
    }

    /// Content of `path` on `branch`, if the branch exists
    pub fn read(&self, repo: &RepoId, branch: &str, path: &str) -> Option<String> {
        let output = Command::new("git")
            .args(["show", &format!("{branch}:{path}")])
            .current_dir(self.bare_path(repo))
            .output()
            .expect("git should run");
        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Commit id at the tip of `branch`, if it exists
    pub fn tip(&self, repo: &RepoId, branch: &str) -> Option<String> {
        let output = Command::new("git")
            .args(["rev-parse", "--verify", "--quiet", &format!("refs/heads/{branch}")])
            .current_dir(self.bare_path(repo))
            .output()
            .expect("git should run");
        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Number of branches in the bare repository
    pub fn branch_count(&self, repo: &RepoId) -> usize {
        git(
            &self.bare_path(repo),
            &["for-each-ref", "--format=%(refname)", "refs/heads"],
        )
        .lines()
        .count()
    }
}

impl Default for LocalRemotes {
    fn default() -> Self {
        Self::new()
    }
}
