//! core::error
//!
//! Error taxonomy for the storage engine.
//!
//! # Taxonomy
//!
//! - [`ApiError::NotFound`] - unknown branch/commit token, or path absent
//!   in the resolved tree
//! - [`ApiError::InvalidBranch`] - target branch does not resolve, or is
//!   missing in a context that requires it explicitly
//! - [`ApiError::BadRequest`] - malformed write payload
//! - [`ApiError::MergeConflict`] - three-way merge produced unresolved
//!   conflicts; carries a per-path report with literal conflict markers
//! - [`ApiError::PushFailed`] - post-push verification found a
//!   local/remote branch tip mismatch
//! - [`ApiError::Internal`] - underlying I/O or git failures
//!
//! # Propagation
//!
//! Errors cross the repo facade verbatim; the HTTP layer maps them to
//! status codes and must only expose the taxonomy message, never internal
//! stack traces. No automatic retries exist anywhere.

use thiserror::Error;

use crate::git::GitError;

/// Errors surfaced by the repo facade.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Unknown version token or absent document path.
    #[error("{0}")]
    NotFound(String),

    /// Target branch token does not resolve, or was required but missing.
    #[error("{0}")]
    InvalidBranch(String),

    /// Malformed write payload.
    #[error("{0}")]
    BadRequest(String),

    /// Three-way merge produced unresolved conflicts.
    ///
    /// The report embeds, per conflicted path, the literal
    /// `<<<<<<<`/`=======`/`>>>>>>>` delimited regions extracted from the
    /// merged working copy.
    #[error("merge conflict\n{report}")]
    MergeConflict {
        /// Per-path conflict report.
        report: String,
    },

    /// Post-push verification found local and remote branch tips disagree.
    #[error("push to '{branch}' failed: local {local} != remote {remote}")]
    PushFailed {
        /// The target branch.
        branch: String,
        /// Local tip after the push.
        local: String,
        /// Remote-tracking tip after the push.
        remote: String,
    },

    /// Underlying I/O or version-control failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Build the `NotFound` error for an unresolvable version token.
    pub fn unknown_version(token: &str) -> Self {
        ApiError::NotFound(format!("could not find branch or commit '{token}'"))
    }
}

impl From<GitError> for ApiError {
    fn from(err: GitError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}
