//! repo::write
//!
//! The write engine: integrates caller-supplied content into the target
//! branch with optimistic concurrency.
//!
//! # State machine
//!
//! 1. **Fetch** - refresh remote-tracking refs, pruning deleted branches
//! 2. **Resolve** - parent version and target branch to commits
//! 3. **Materialize** - detach the working copy to the parent and apply
//!    the payload
//! 4. **Diff** - zero deltas short-circuits to the parent's own id; no
//!    empty commit is ever created
//! 5. **Commit** - new commit whose sole parent is the parent commit
//! 6. **Reconcile** - fast-forward when the branch has not advanced,
//!    otherwise a three-way merge; unresolved conflicts abort the write
//! 7. **Push** - push the result and verify the local and remote-tracking
//!    tips agree afterwards
//!
//! Conflict detection is purely ancestry-and-merge based: writes reference
//! a parent commit, not a version counter, and a failed write leaves the
//! remote branch exactly as it was.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use crate::core::config::Signature;
use crate::core::error::ApiError;
use crate::core::types::{BranchName, CommitId};
use crate::core::vars::ContentVars;
use crate::git::{Git, MergeOutcome};

use super::payload::WritePayload;
use super::resolve::{resolve_target_branch, resolve_version};

/// One write request's inputs, beyond the payload itself.
#[derive(Debug)]
pub struct WriteRequestMeta<'a> {
    /// Version token the caller based their edit on.
    pub parent_version: &'a str,
    /// Explicit target branch; defaults to `parent_version` when that is
    /// itself a branch name.
    pub target_branch: Option<&'a str>,
    /// Document path the payload applies to.
    pub path: &'a str,
    /// Display name attributed as the commit author.
    pub author: Option<&'a str>,
}

/// Orchestrates one write against the shared working copy.
///
/// Must only run while the repo's operation lock is held.
pub struct WriteEngine<'a> {
    git: &'a Git,
    signature: &'a Signature,
    vars: &'a ContentVars,
}

impl<'a> WriteEngine<'a> {
    pub fn new(git: &'a Git, signature: &'a Signature, vars: &'a ContentVars) -> Self {
        Self {
            git,
            signature,
            vars,
        }
    }

    /// Run the write state machine to completion.
    ///
    /// Returns the resulting commit id: the parent's own id for a no-op,
    /// the new commit for a fast-forward, or the merge commit on
    /// divergence.
    pub fn execute(
        &self,
        meta: &WriteRequestMeta<'_>,
        payload: &WritePayload,
    ) -> Result<CommitId, ApiError> {
        validate_path(meta.path, payload)?;

        self.git.fetch_origin()?;

        let parent = resolve_version(self.git, meta.parent_version)?;
        let (branch, branch_commit) = match meta.target_branch {
            Some(token) => resolve_target_branch(self.git, token)?,
            None => resolve_target_branch(self.git, meta.parent_version).map_err(|_| {
                ApiError::InvalidBranch(
                    "target branch is required when the parent version is not a branch".to_string(),
                )
            })?,
        };

        self.materialize(&parent, meta.path, payload)?;

        let deltas = self.git.workdir_delta_count(&parent)?;
        if deltas == 0 {
            debug!(parent = %parent.short(7), "write is a no-op");
            return Ok(parent);
        }

        let message = format!(
            "Update {}",
            if meta.path.is_empty() { "/" } else { meta.path }
        );
        let author = meta.author.unwrap_or(&self.signature.name);
        let new_commit = self.git.commit_workdir(
            &parent,
            author,
            &self.signature.name,
            &self.signature.email,
            &message,
        )?;

        let result = self.reconcile(&branch_commit, &new_commit)?;

        self.git.set_local_branch(&branch, &result)?;
        self.git.push_origin(&branch)?;
        self.verify_push(&branch)?;

        info!(branch = %branch, commit = %result.short(7), "write pushed");
        Ok(result)
    }

    /// Detach the working copy to `parent` and apply the payload.
    fn materialize(
        &self,
        parent: &CommitId,
        path: &str,
        payload: &WritePayload,
    ) -> Result<(), ApiError> {
        self.git.checkout_detached(parent)?;
        let workdir = self.git.workdir()?;

        match payload {
            WritePayload::Subtree(files) => {
                let dir = subtree_dir(&workdir, path);
                clear_subtree(&workdir, &dir)?;
                for (key, value) in files {
                    validate_segments(key)?;
                    let file = dir.join(format!("{key}.json"));
                    self.write_document(&file, value)?;
                }
            }
            WritePayload::SingleFile(value) => {
                let file = workdir.join(format!("{path}.json"));
                self.write_document(&file, value)?;
            }
        }

        Ok(())
    }

    /// Serialize a document as pretty-printed JSON with a trailing
    /// newline, values substituted back to `${name}` placeholders.
    fn write_document(&self, file: &Path, value: &Value) -> Result<(), ApiError> {
        if let Some(dir) = file.parent() {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| ApiError::Internal(format!("cannot serialize document: {e}")))?;
        let content = self.vars.replace_values_with_variables(&format!("{json}\n"));
        fs::write(file, content)?;
        Ok(())
    }

    /// Fast-forward when the branch has not advanced past the parent,
    /// otherwise three-way merge the branch head with the new commit.
    fn reconcile(
        &self,
        branch_commit: &CommitId,
        new_commit: &CommitId,
    ) -> Result<CommitId, ApiError> {
        if self.git.is_ancestor(branch_commit, new_commit)? {
            return Ok(new_commit.clone());
        }

        info!(
            branch_tip = %branch_commit.short(7),
            new_commit = %new_commit.short(7),
            "branch advanced since parent, merging"
        );

        match self.git.merge_commits(branch_commit, new_commit)? {
            MergeOutcome::Clean { tree_id } => Ok(self.git.commit_tree(
                &tree_id,
                [new_commit, branch_commit],
                &self.signature.name,
                &self.signature.email,
                "Merge",
            )?),
            MergeOutcome::Conflicted { report } => Err(ApiError::MergeConflict { report }),
        }
    }

    /// Some remote transports report success without a reliable error
    /// code, so compare the local and remote-tracking tips after pushing.
    fn verify_push(&self, branch: &BranchName) -> Result<(), ApiError> {
        let (local, remote) = self.git.branch_tips(branch)?;
        if local != remote {
            return Err(ApiError::PushFailed {
                branch: branch.to_string(),
                local: tip_label(local),
                remote: tip_label(remote),
            });
        }
        Ok(())
    }
}

fn tip_label(tip: Option<CommitId>) -> String {
    tip.map(|c| c.to_string()).unwrap_or_else(|| "<none>".to_string())
}

fn subtree_dir(workdir: &Path, path: &str) -> PathBuf {
    if path.is_empty() {
        workdir.to_path_buf()
    } else {
        workdir.join(path)
    }
}

/// Remove the subtree directory's current content. Clearing the repository
/// root leaves `.git` untouched.
fn clear_subtree(workdir: &Path, dir: &Path) -> Result<(), ApiError> {
    if dir == workdir {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_name() == ".git" {
                continue;
            }
            let path = entry.path();
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
        }
    } else {
        match fs::remove_dir_all(dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Reject paths that would escape the working copy or touch `.git`.
fn validate_path(path: &str, payload: &WritePayload) -> Result<(), ApiError> {
    if path.is_empty() {
        return match payload {
            WritePayload::Subtree(_) => Ok(()),
            WritePayload::SingleFile(_) => Err(ApiError::BadRequest(
                "a single-file write requires a non-empty path".to_string(),
            )),
        };
    }
    validate_segments(path)
}

fn validate_segments(path: &str) -> Result<(), ApiError> {
    for segment in path.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." || segment == ".git" {
            return Err(ApiError::BadRequest(format!("invalid path '{path}'")));
        }
    }
    Ok(())
}
