//! repo::resolve
//!
//! Version token resolution.
//!
//! A version token is either a branch name (dereferenced through the
//! remote-tracking ref, so it always reflects the most recently fetched
//! remote state) or a raw commit id (stable forever). Resolution is an
//! ordered attempt - branch first, then commit - short-circuiting on the
//! first success; intermediate lookup failures are never surfaced, only
//! the final combined `NotFound`.

use crate::core::error::ApiError;
use crate::core::types::{BranchName, CommitId};
use crate::git::Git;

/// Resolve a version token to a commit.
///
/// # Errors
///
/// [`ApiError::NotFound`] with the literal token embedded when neither a
/// remote-tracking branch nor a commit matches.
pub fn resolve_version(git: &Git, token: &str) -> Result<CommitId, ApiError> {
    if let Ok(branch) = BranchName::new(token) {
        if let Some(commit) = git.try_resolve_remote_branch(&branch)? {
            return Ok(commit);
        }
    }

    if let Some(commit) = git.try_resolve_commit(token)? {
        return Ok(commit);
    }

    Err(ApiError::unknown_version(token))
}

/// Resolve a write target branch.
///
/// Only a remote-tracking branch is accepted; a nonexistent target branch
/// is never silently created.
///
/// # Errors
///
/// [`ApiError::InvalidBranch`] when `token` is not a valid branch name or
/// the branch does not exist on the remote.
pub fn resolve_target_branch(git: &Git, token: &str) -> Result<(BranchName, CommitId), ApiError> {
    let branch = BranchName::new(token)
        .map_err(|_| ApiError::InvalidBranch(format!("invalid branch name '{token}'")))?;

    match git.try_resolve_remote_branch(&branch)? {
        Some(commit) => Ok((branch, commit)),
        None => Err(ApiError::InvalidBranch(format!(
            "branch '{token}' does not exist"
        ))),
    }
}
