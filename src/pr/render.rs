//! Title, body and commit message rendering
//!
//! Everything here is a pure function of the change set, so re-running
//! against the same repository state renders byte-identical text. The
//! submitter relies on that to detect an up-to-date pull request.

use crate::plan::ChangeSet;
use crate::types::PullRequestSpec;
use std::fmt::Write as _;

/// Hidden marker identifying pull requests opened by this tool
pub const BODY_MARKER: &str = "<!-- runtime-bump -->";

/// PR title for a change set
///
/// Individual-policy change sets touching a single runtime name the key,
/// version and runtime; everything else gets the repository-level title.
pub fn pr_title(change_set: &ChangeSet) -> String {
    let updates = change_set.runtime_updates();
    match (change_set.consolidated, updates.as_slice(), change_set.records.first()) {
        (false, [(runtime, version)], Some(record)) => {
            format!("Update {} to {version} for {runtime}", record.key)
        }
        _ => format!("Update runtime versions in {}", change_set.repo.name),
    }
}

/// Commit message: the title, then runtime updates and touched files
pub fn commit_message(change_set: &ChangeSet) -> String {
    let mut message = pr_title(change_set);

    let updates = change_set.runtime_updates();
    if updates.len() > 1 || change_set.consolidated {
        message.push_str("\n\nRuntime updates:\n");
        for (runtime, version) in &updates {
            let _ = writeln!(message, "- {runtime} -> {version}");
        }
        message.pop();
    }

    message.push_str("\n\nFiles updated:\n");
    for path in change_set.touched_paths() {
        let _ = writeln!(message, "- {path}");
    }
    message.pop();
    message
}

/// Markdown PR body
pub fn pr_body(change_set: &ChangeSet) -> String {
    let updates = change_set.runtime_updates();
    let mut body = String::new();

    match (change_set.consolidated, updates.as_slice()) {
        (false, [(runtime, version)]) => {
            let _ = writeln!(
                body,
                "This PR updates `{runtime}` to `{version}` in `{}`.",
                change_set.repo.slug()
            );
        }
        _ => {
            let _ = writeln!(
                body,
                "This PR updates runtime versions in `{}`.",
                change_set.repo.slug()
            );
        }
    }

    body.push_str("\n**Runtime updates:**\n");
    for (runtime, version) in &updates {
        let _ = writeln!(body, "- **{runtime}**: `{version}`");
    }

    body.push_str("\n**Files updated:**\n");
    for path in change_set.touched_paths() {
        let _ = writeln!(body, "- `{path}`");
    }

    let _ = writeln!(body, "\n**Target branch:** `{}`", change_set.base_branch);

    body.push_str("\n| File | Line | Key | Old | New |\n| --- | --- | --- | --- | --- |\n");
    for record in &change_set.records {
        let _ = writeln!(
            body,
            "| `{}` | {} | `{}` | `{}` | `{}` |",
            record.path, record.line, record.key, record.old, record.new
        );
    }

    body.push_str("\nThis PR was generated automatically by runtime-bump.\n");
    body.push_str(BODY_MARKER);
    body.push('\n');
    body
}

/// Plain-text preview of a change set, used for dry runs
pub fn change_report(change_set: &ChangeSet) -> String {
    let mut report = format!(
        "{} ({} → {})\n",
        change_set.repo, change_set.head_branch, change_set.base_branch
    );
    for record in &change_set.records {
        let _ = writeln!(
            report,
            "  {}:{} {} {} → {}",
            record.path, record.line, record.key, record.old, record.new
        );
    }
    report.pop();
    report
}

/// Pull request to open for a change set whose branch lives under `head_owner`
pub fn pull_request_spec(change_set: &ChangeSet, head_owner: &str) -> PullRequestSpec {
    PullRequestSpec {
        repo: change_set.repo.clone(),
        head_owner: head_owner.to_string(),
        source_branch: change_set.head_branch.clone(),
        target_branch: change_set.base_branch.clone(),
        title: pr_title(change_set),
        body: pr_body(change_set),
        consolidated: change_set.consolidated,
    }
}
