//! Run summary
//!
//! Aggregates per-repository outcomes into the final report: a markdown
//! summary for workflow step summaries and a PR count for workflow outputs.

use crate::error::Result;
use crate::exec::{ChangeSetOutcome, RepoOutcome};
use crate::plan::{ComponentFilter, RuntimeFilter};
use crate::pr::PullRequestOutcome;
use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::path::Path;

/// Outcome counts by kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    /// Nothing to change
    pub skipped: usize,
    /// Previewed only
    pub dry_run: usize,
    /// New pull requests
    pub created: usize,
    /// Refreshed pull requests
    pub updated: usize,
    /// Pull requests that already matched
    pub up_to_date: usize,
    /// Failed change sets
    pub failed: usize,
    /// Cancelled change sets
    pub cancelled: usize,
}

/// Everything that happened during one run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
    /// Base branch override, if any
    pub target_branch: Option<String>,
    /// Runtime selection
    pub runtime_filter: RuntimeFilter,
    /// Component selection
    pub component_filter: ComponentFilter,
    /// Whether the run was a preview
    pub dry_run: bool,
    /// Per-repository outcomes in declared order
    pub outcomes: Vec<RepoOutcome>,
}

impl RunReport {
    /// Outcome counts by kind
    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for outcome in &self.outcomes {
            match &outcome.outcome {
                ChangeSetOutcome::Skipped => counts.skipped += 1,
                ChangeSetOutcome::DryRunReported(_) => counts.dry_run += 1,
                ChangeSetOutcome::Applied(PullRequestOutcome::Created(_)) => counts.created += 1,
                ChangeSetOutcome::Applied(PullRequestOutcome::Updated(_)) => counts.updated += 1,
                ChangeSetOutcome::Applied(PullRequestOutcome::AlreadyUpToDate(_)) => {
                    counts.up_to_date += 1;
                }
                ChangeSetOutcome::Failed(_) => counts.failed += 1,
                ChangeSetOutcome::Cancelled => counts.cancelled += 1,
            }
        }
        counts
    }

    /// The run fails only when every change set failed
    pub fn is_failure(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(|o| o.outcome.is_failure())
    }

    /// Number of pull requests created or updated
    pub fn pr_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.outcome.pull_request())
            .filter(|pr| pr.is_change())
            .count()
    }

    /// Markdown summary, one line per repository
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let branch = self.target_branch.as_deref().unwrap_or("(repository default)");
        let _ = writeln!(out, "**Target Branch:** {branch}");
        if self.runtime_filter != RuntimeFilter::All {
            let _ = writeln!(out, "**Runtime Filter:** {}", self.runtime_filter);
        }
        if self.component_filter != ComponentFilter::Both {
            let _ = writeln!(out, "**Component:** {}", self.component_filter);
        }
        let _ = writeln!(out, "**Dry Run:** {}", if self.dry_run { "Yes" } else { "No" });
        let _ = writeln!(
            out,
            "**Finished:** {}\n",
            self.finished_at.format("%Y-%m-%d %H:%M:%S UTC")
        );

        if self.outcomes.is_empty() {
            out.push_str("⚠️ No repositories matched the filters\n");
            return out;
        }

        for outcome in &self.outcomes {
            let _ = writeln!(out, "{}", summary_line(outcome));
        }
        out
    }

    /// Write the markdown summary to `path`
    pub fn write_summary(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_markdown())?;
        Ok(())
    }

    /// Write the PR count to `path`
    pub fn write_pr_count(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.pr_count().to_string())?;
        Ok(())
    }
}

fn summary_line(outcome: &RepoOutcome) -> String {
    let repo = outcome.change_set.repo.slug();
    match &outcome.outcome {
        ChangeSetOutcome::Skipped => format!("⚠️ {repo}: No changes needed"),
        ChangeSetOutcome::DryRunReported(_) => format!(
            "🔍 {repo}: Would update {} value(s) (dry run)",
            outcome.change_set.records.len()
        ),
        ChangeSetOutcome::Applied(PullRequestOutcome::Created(pr)) => {
            format!("✅ {repo}: [PR created]({})", pr.html_url)
        }
        ChangeSetOutcome::Applied(PullRequestOutcome::Updated(pr)) => {
            format!("🔄 {repo}: [PR updated]({})", pr.html_url)
        }
        ChangeSetOutcome::Applied(PullRequestOutcome::AlreadyUpToDate(pr)) => {
            format!("☑️ {repo}: [PR up to date]({})", pr.html_url)
        }
        ChangeSetOutcome::Failed(reason) => format!("❌ {repo}: {reason}"),
        ChangeSetOutcome::Cancelled => format!("⏹️ {repo}: Cancelled"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::ChangeSet;
    use crate::types::{Component, PrState, PullRequest, RepoId};

    fn outcome(name: &str, outcome: ChangeSetOutcome) -> RepoOutcome {
        RepoOutcome {
            change_set: ChangeSet {
                repo: RepoId::new("github.com", "org", name),
                component: Component::Vllm,
                base_branch: "main".to_string(),
                head_branch: "runtime-bump/main".to_string(),
                consolidated: false,
                records: Vec::new(),
                files: Vec::new(),
                drift: Vec::new(),
            },
            outcome,
        }
    }

    fn pr(number: u64) -> PullRequest {
        PullRequest {
            number,
            html_url: format!("https://github.com/org/r/pull/{number}"),
            base_ref: "main".to_string(),
            head_ref: "runtime-bump/main".to_string(),
            title: "t".to_string(),
            body: None,
            state: PrState::Open,
            author: Some("bot".to_string()),
        }
    }

    fn report(outcomes: Vec<RepoOutcome>) -> RunReport {
        let now = Utc::now();
        RunReport {
            started_at: now,
            finished_at: now,
            target_branch: Some("main".to_string()),
            runtime_filter: RuntimeFilter::All,
            component_filter: ComponentFilter::Both,
            dry_run: false,
            outcomes,
        }
    }

    #[test]
    fn test_partial_failure_is_not_run_failure() {
        let r = report(vec![
            outcome("a", ChangeSetOutcome::Failed("boom".to_string())),
            outcome("b", ChangeSetOutcome::Skipped),
        ]);
        assert!(!r.is_failure());
    }

    #[test]
    fn test_all_failed_is_run_failure() {
        let r = report(vec![
            outcome("a", ChangeSetOutcome::Failed("boom".to_string())),
            outcome("b", ChangeSetOutcome::Failed("bang".to_string())),
        ]);
        assert!(r.is_failure());
        assert!(!report(Vec::new()).is_failure());
    }

    #[test]
    fn test_pr_count_excludes_up_to_date() {
        let r = report(vec![
            outcome("a", ChangeSetOutcome::Applied(PullRequestOutcome::Created(pr(1)))),
            outcome("b", ChangeSetOutcome::Applied(PullRequestOutcome::Updated(pr(2)))),
            outcome(
                "c",
                ChangeSetOutcome::Applied(PullRequestOutcome::AlreadyUpToDate(pr(3))),
            ),
        ]);
        assert_eq!(r.pr_count(), 2);
        let counts = r.counts();
        assert_eq!((counts.created, counts.updated, counts.up_to_date), (1, 1, 1));
    }

    #[test]
    fn test_markdown_lines() {
        let mut r = report(vec![
            outcome("vllm", ChangeSetOutcome::Applied(PullRequestOutcome::Created(pr(7)))),
            outcome("vllm-cpu", ChangeSetOutcome::Skipped),
            outcome("vllm-rocm", ChangeSetOutcome::Failed("clone failed".to_string())),
        ]);
        r.runtime_filter = RuntimeFilter::Only("vllm".to_string());
        let md = r.to_markdown();
        assert!(md.starts_with("**Target Branch:** main\n**Runtime Filter:** vllm\n**Dry Run:** No\n"));
        assert!(md.contains("✅ org/vllm: [PR created](https://github.com/org/r/pull/7)\n"));
        assert!(md.contains("⚠️ org/vllm-cpu: No changes needed\n"));
        assert!(md.contains("❌ org/vllm-rocm: clone failed\n"));
    }

    #[test]
    fn test_write_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let r = report(vec![outcome(
            "a",
            ChangeSetOutcome::Applied(PullRequestOutcome::Created(pr(1))),
        )]);
        let summary = dir.path().join("summary.md");
        let count = dir.path().join("pr_count.txt");
        r.write_summary(&summary).unwrap();
        r.write_pr_count(&count).unwrap();
        assert_eq!(std::fs::read_to_string(count).unwrap(), "1");
        assert!(std::fs::read_to_string(summary).unwrap().contains("PR created"));
    }
}
