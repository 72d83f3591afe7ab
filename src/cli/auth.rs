//! Auth command - verify GitHub credentials

use crate::cli::style::{Stylize, check};
use anstream::println;
use runtime_bump::auth::{get_github_auth, test_github_auth};
use runtime_bump::error::Result;

/// Run the auth command
pub async fn run_auth(host: Option<&str>) -> Result<()> {
    let auth = get_github_auth(host).await?;
    println!(
        "{} Found token for {} ({})",
        check(),
        auth.host.accent(),
        auth.source.muted()
    );

    let login = test_github_auth(&auth).await?;
    println!("{} Authenticated as {}", check(), login.accent());
    Ok(())
}
