//! runtime-bump - propagate runtime versions into downstream repositories
//!
//! A configuration maps runtime names to versions and lists the repositories
//! whose container build files and manifest templates pin those versions.
//! A run checks out each repository, plans the minimal textual edits, and
//! then (unless previewing) pushes a branch and opens or refreshes one pull
//! request per repository.
//!
//! Planning is pure; only [`exec`] mutates external state.

pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod exec;
pub mod gateway;
pub mod plan;
pub mod platform;
pub mod pr;
pub mod report;
pub mod rules;
pub mod types;

pub use error::{Error, Result};
