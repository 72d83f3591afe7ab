//! Change set execution
//!
//! The only stage that mutates external state. Each change set ends in one
//! of: skipped, dry-run reported, applied, failed or cancelled.

mod execute;
mod progress;
mod retry;

pub use execute::{
    ChangeSetOutcome, ExecutionOptions, Executor, PreparedChangeSet, RepoOutcome,
};
pub use progress::{NoopProgress, ProgressCallback};
pub use retry::{RetryPolicy, with_retry};
