//! Change planning
//!
//! Turns a configuration plus repository snapshots into change sets without
//! touching any repository. Planning is synchronous and side-effect free;
//! execution is the only stage that mutates external state.

mod planner;
mod source;

pub use planner::{
    head_branch_name, plan, plan_repository, select_repositories, ChangeRecord, ChangeSet,
    ComponentFilter, Drift, FileEdit, RunFilter, RuntimeFilter,
};
pub use source::{glob_matcher, is_glob, resolve_paths, ContentSource, MemorySource};
