//! Check command - validate the configuration without touching any repository

use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, arrow, check};
use anstream::println;
use runtime_bump::error::Result;
use runtime_bump::plan::RunFilter;
use std::path::Path;

/// Run the check command
pub fn run_check(config_path: &Path, filter: &RunFilter) -> Result<()> {
    let ctx = CommandContext::load(config_path)?;
    filter.validate(&ctx.config)?;
    let config = &ctx.config;

    println!(
        "{} {} is valid",
        check(),
        config_path.display().accent()
    );
    println!();

    println!("{}:", "Runtimes".emphasis());
    for (runtime, version) in &config.runtimes {
        println!("  {} {} {}", arrow(), runtime, version.accent());
    }
    println!();

    println!("{}:", "Repositories".emphasis());
    for target in &config.repositories {
        let selected = filter.selects_repository(target);
        let policy = if target.consolidate {
            "consolidated"
        } else {
            "individual"
        };
        let header = format!(
            "{} ({}, {}, base {})",
            target.repo,
            target.component,
            policy,
            filter.base_branch_for(target)
        );
        if selected {
            println!("  {}", header.accent());
        } else {
            println!("  {} {}", header.muted(), "(filtered out)".muted());
            continue;
        }
        for rule in target.rules.iter().filter(|r| filter.selects_rule(r)) {
            println!(
                "    {} {} in {} {}",
                arrow(),
                rule,
                rule.path(),
                format!("[{}]", rule.runtime()).muted()
            );
        }
    }

    Ok(())
}
