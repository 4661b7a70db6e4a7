//! Push validation and execution.
//!
//! Validates the remote URL against the declared hosting provider before any
//! push subprocess runs; a mismatch is fatal and descriptive.

use crate::config::PushConfig;
use crate::git::GitRepo;
use crate::git::utils::run_git_command;
use crate::log_debug;
use anyhow::{Result, anyhow};

use crate::config::PushProvider;

/// Checks that the resolved remote URL matches the declared provider.
pub fn validate_remote_url(provider: PushProvider, remote: &str, url: &str) -> Result<()> {
    if let Some(marker) = provider.url_marker()
        && !url.to_lowercase().contains(marker)
    {
        return Err(anyhow!(
            "Remote '{remote}' ({url}) does not look like a {provider} remote; refusing to push"
        ));
    }
    Ok(())
}

/// Validates the remote and pushes the branch. Fatal on validation mismatch
/// and on any non-zero exit from the push subprocess.
pub fn validate_and_push(repo: &GitRepo, push: &PushConfig, branch: &str) -> Result<()> {
    let url = repo.remote_url(&push.remote)?;
    validate_remote_url(push.provider, &push.remote, &url)?;

    log_debug!("Pushing {} to {} ({})", branch, push.remote, url);
    run_git_command(repo.repo_path(), &["push", &push.remote, branch])?;
    Ok(())
}
