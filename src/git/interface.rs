//! git::interface
//!
//! Git interface implementation using git2.
//!
//! The [`Git`] struct is the only way to interact with the shared local
//! repository. It provides structured results and normalizes git2 errors
//! into typed failure categories, so higher layers never branch on raw
//! libgit2 error codes.
//!
//! # Concurrency
//!
//! The interface itself performs no locking. Callers route every operation
//! through the repo facade's operation lock; the working copy, index, and
//! HEAD are shared mutable state and two concurrent checkouts would corrupt
//! them.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::{BranchName, CommitId, TypeError};

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Cloning the remote repository failed.
    #[error("cannot clone '{uri}': {message}")]
    CloneFailed {
        /// The remote URI.
        uri: String,
        /// The underlying message.
        message: String,
    },

    /// Requested ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound {
        /// The ref that was not found.
        refname: String,
    },

    /// Object not found in repository.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// The id that was not found.
        oid: String,
    },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidId {
        /// The invalid id string.
        oid: String,
    },

    /// Blob content is not valid UTF-8.
    #[error("blob at '{path}' is not valid UTF-8")]
    InvalidUtf8 {
        /// Repository path of the blob.
        path: String,
    },

    /// Repository has no working directory.
    #[error("repository has no working directory")]
    NoWorkdir,

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message.
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => {
                if context.starts_with("refs/") || context.contains("ref") {
                    GitError::RefNotFound {
                        refname: context.to_string(),
                    }
                } else {
                    GitError::ObjectNotFound {
                        oid: context.to_string(),
                    }
                }
            }
            git2::ErrorCode::InvalidSpec => GitError::InvalidId {
                oid: context.to_string(),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidCommitId(msg) => GitError::InvalidId { oid: msg },
            TypeError::InvalidBranchName(msg) => GitError::Internal { message: msg },
        }
    }
}

/// A JSON file enumerated from a commit's tree.
#[derive(Debug, Clone)]
pub struct TreeFile {
    /// Repository-relative path, e.g. `dir/nested.json`.
    pub path: String,
    /// Decoded file content.
    pub content: String,
}

/// Result of a three-way merge of two commits.
#[derive(Debug)]
pub enum MergeOutcome {
    /// The merge is clean; the merged tree has been written to the object
    /// database and can be committed with [`Git::commit_tree`].
    Clean {
        /// Object id of the merged tree.
        tree_id: String,
    },
    /// The merge has unresolved conflicts.
    Conflicted {
        /// Per-path report embedding the literal conflict-marker blocks.
        report: String,
    },
}

/// The Git interface.
///
/// One instance owns one local working copy bound to one remote
/// (`origin`). See the module docs for the concurrency contract.
pub struct Git {
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git").field("path", &self.repo.path()).finish()
    }
}

impl Git {
    // =========================================================================
    // Opening
    // =========================================================================

    /// Open the repository at `path`, cloning from `uri` if absent.
    ///
    /// The clone is a full (non-bare) clone: the write pipeline materializes
    /// payloads in the working copy.
    ///
    /// # Errors
    ///
    /// - [`GitError::CloneFailed`] if neither open nor clone succeeds
    pub fn open_or_clone(path: &Path, uri: &str) -> Result<Self, GitError> {
        let repo = match git2::Repository::open(path) {
            Ok(repo) => repo,
            Err(_) => git2::Repository::clone(uri, path).map_err(|e| GitError::CloneFailed {
                uri: uri.to_string(),
                message: e.message().to_string(),
            })?,
        };

        Ok(Self { repo })
    }

    /// Path to the working directory.
    pub fn workdir(&self) -> Result<PathBuf, GitError> {
        self.repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or(GitError::NoWorkdir)
    }

    // =========================================================================
    // Fetch
    // =========================================================================

    /// Fetch `origin`, pruning remote-tracking refs for deleted branches.
    pub fn fetch_origin(&self) -> Result<(), GitError> {
        let mut remote = self
            .repo
            .find_remote("origin")
            .map_err(|e| GitError::from_git2(e, "origin"))?;

        let mut opts = git2::FetchOptions::new();
        opts.prune(git2::FetchPrune::On);

        remote
            .fetch(&[] as &[&str], Some(&mut opts), None)
            .map_err(|e| GitError::Internal {
                message: format!("fetch origin: {}", e.message()),
            })
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Resolve a remote-tracking branch to its commit, if the branch exists.
    pub fn try_resolve_remote_branch(
        &self,
        branch: &BranchName,
    ) -> Result<Option<CommitId>, GitError> {
        self.try_resolve_ref(&branch.remote_ref())
    }

    /// Resolve a local branch to its commit, if the branch exists.
    pub fn try_resolve_local_branch(
        &self,
        branch: &BranchName,
    ) -> Result<Option<CommitId>, GitError> {
        self.try_resolve_ref(&branch.local_ref())
    }

    /// Interpret `token` directly as a commit id, if one exists.
    ///
    /// Abbreviated ids are not accepted; resolution of a full id is stable
    /// forever (content-addressed).
    pub fn try_resolve_commit(&self, token: &str) -> Result<Option<CommitId>, GitError> {
        let oid = match git2::Oid::from_str(token) {
            Ok(oid) => oid,
            Err(_) => return Ok(None),
        };
        match self.repo.find_commit(oid) {
            Ok(commit) => Ok(Some(CommitId::new(commit.id().to_string())?)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, token)),
        }
    }

    fn try_resolve_ref(&self, refname: &str) -> Result<Option<CommitId>, GitError> {
        match self.repo.find_reference(refname) {
            Ok(reference) => {
                let commit = reference
                    .peel_to_commit()
                    .map_err(|e| GitError::from_git2(e, refname))?;
                Ok(Some(CommitId::new(commit.id().to_string())?))
            }
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, refname)),
        }
    }

    // =========================================================================
    // Tree Enumeration
    // =========================================================================

    /// Enumerate every `.json` file reachable from a commit's tree.
    ///
    /// Traversal is breadth-first, so entries deeper in the tree appear
    /// after their siblings' parents; callers rely on this order when two
    /// files collide at the same logical path.
    ///
    /// # Errors
    ///
    /// - [`GitError::InvalidUtf8`] if a `.json` blob is not UTF-8
    pub fn json_files(&self, commit: &CommitId) -> Result<Vec<TreeFile>, GitError> {
        let commit = self.find_commit(commit)?;
        let tree = commit.tree().map_err(GitError::from)?;

        let mut files = Vec::new();
        let mut queue: VecDeque<(String, git2::Tree<'_>)> = VecDeque::new();
        queue.push_back((String::new(), tree));

        while let Some((prefix, tree)) = queue.pop_front() {
            for entry in tree.iter() {
                let name = match entry.name() {
                    Some(n) => n,
                    None => continue, // non-UTF8 entry names are skipped
                };
                let path = if prefix.is_empty() {
                    name.to_string()
                } else {
                    format!("{prefix}/{name}")
                };

                match entry.kind() {
                    Some(git2::ObjectType::Tree) => {
                        let subtree = entry
                            .to_object(&self.repo)
                            .and_then(|o| o.peel_to_tree())
                            .map_err(|e| GitError::from_git2(e, &path))?;
                        queue.push_back((path, subtree));
                    }
                    Some(git2::ObjectType::Blob) if path.ends_with(".json") => {
                        let blob = entry
                            .to_object(&self.repo)
                            .and_then(|o| o.peel_to_blob())
                            .map_err(|e| GitError::from_git2(e, &path))?;
                        let content = std::str::from_utf8(blob.content())
                            .map_err(|_| GitError::InvalidUtf8 { path: path.clone() })?
                            .to_string();
                        files.push(TreeFile { path, content });
                    }
                    _ => {}
                }
            }
        }

        Ok(files)
    }

    // =========================================================================
    // Working Copy
    // =========================================================================

    /// Detach HEAD to `commit` and force-checkout its tree, discarding
    /// local modifications, untracked files, and ignored files.
    pub fn checkout_detached(&self, commit: &CommitId) -> Result<(), GitError> {
        let target = self.find_commit(commit)?;
        let tree = target.tree().map_err(GitError::from)?;

        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout
            .force()
            .remove_untracked(true)
            .remove_ignored(true);

        self.repo
            .checkout_tree(tree.as_object(), Some(&mut checkout))
            .map_err(|e| GitError::from_git2(e, commit.as_str()))?;
        self.repo
            .set_head_detached(target.id())
            .map_err(GitError::from)?;

        Ok(())
    }

    /// Count tree deltas between `parent`'s tree and the working copy,
    /// untracked additions included.
    pub fn workdir_delta_count(&self, parent: &CommitId) -> Result<usize, GitError> {
        let parent_tree = self.find_commit(parent)?.tree().map_err(GitError::from)?;

        let mut opts = git2::DiffOptions::new();
        opts.include_untracked(true).recurse_untracked_dirs(true);

        let diff = self
            .repo
            .diff_tree_to_workdir_with_index(Some(&parent_tree), Some(&mut opts))
            .map_err(GitError::from)?;

        Ok(diff.deltas().len())
    }

    /// Stage the entire working copy and commit it with `parent` as the
    /// sole parent. Returns the new commit's id. No ref is updated.
    pub fn commit_workdir(
        &self,
        parent: &CommitId,
        author: &str,
        committer_name: &str,
        committer_email: &str,
        message: &str,
    ) -> Result<CommitId, GitError> {
        let mut index = self.repo.index().map_err(GitError::from)?;
        index
            .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
            .map_err(GitError::from)?;
        // add_all stages additions and modifications; update_all stages
        // deletions of tracked files
        index.update_all(["*"].iter(), None).map_err(GitError::from)?;
        index.write().map_err(GitError::from)?;

        let tree_oid = index.write_tree().map_err(GitError::from)?;
        let tree = self.repo.find_tree(tree_oid).map_err(GitError::from)?;
        let parent_commit = self.find_commit(parent)?;

        let author = git2::Signature::now(author, committer_email).map_err(GitError::from)?;
        let committer =
            git2::Signature::now(committer_name, committer_email).map_err(GitError::from)?;

        let oid = self
            .repo
            .commit(None, &author, &committer, message, &tree, &[&parent_commit])
            .map_err(GitError::from)?;

        Ok(CommitId::new(oid.to_string())?)
    }

    // =========================================================================
    // Ancestry and Merge
    // =========================================================================

    /// Check if `ancestor` is an ancestor of `descendant`.
    ///
    /// A commit counts as its own ancestor.
    pub fn is_ancestor(&self, ancestor: &CommitId, descendant: &CommitId) -> Result<bool, GitError> {
        if ancestor == descendant {
            return Ok(true);
        }

        let ancestor_oid = self.oid(ancestor)?;
        let descendant_oid = self.oid(descendant)?;

        self.repo
            .graph_descendant_of(descendant_oid, ancestor_oid)
            .map_err(GitError::from)
    }

    /// Three-way merge of `ours` and `theirs` using their common ancestor.
    ///
    /// On a clean merge, the merged tree is written to the object database
    /// and returned for [`Git::commit_tree`]. On conflicts, the conflicted
    /// index is materialized into the working copy and the literal
    /// conflict-marker blocks are extracted into a per-path report; paths
    /// are de-duplicated, order stable.
    pub fn merge_commits(
        &self,
        ours: &CommitId,
        theirs: &CommitId,
    ) -> Result<MergeOutcome, GitError> {
        let our_commit = self.find_commit(ours)?;
        let their_commit = self.find_commit(theirs)?;

        let mut index = self
            .repo
            .merge_commits(&our_commit, &their_commit, None)
            .map_err(GitError::from)?;

        if !index.has_conflicts() {
            let tree_oid = index.write_tree_to(&self.repo).map_err(GitError::from)?;
            return Ok(MergeOutcome::Clean {
                tree_id: tree_oid.to_string(),
            });
        }

        let paths = conflicted_paths(&index)?;

        // Materialize the conflicted index so the marker blocks exist on
        // disk, then pull them back out per path.
        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout
            .force()
            .allow_conflicts(true)
            .conflict_style_merge(true);
        self.repo
            .checkout_index(Some(&mut index), Some(&mut checkout))
            .map_err(GitError::from)?;

        let workdir = self.workdir()?;
        let mut report = String::new();
        for path in &paths {
            let content = std::fs::read_to_string(workdir.join(path)).unwrap_or_default();
            let markers = extract_conflict_markers(&content);
            report.push_str(path);
            report.push_str(":\n");
            report.push_str(&markers);
            if !markers.ends_with('\n') {
                report.push('\n');
            }
        }

        Ok(MergeOutcome::Conflicted { report })
    }

    /// Create a commit from an already-written tree with explicit parents.
    /// Used for merge commits. No ref is updated.
    pub fn commit_tree(
        &self,
        tree_id: &str,
        parents: [&CommitId; 2],
        name: &str,
        email: &str,
        message: &str,
    ) -> Result<CommitId, GitError> {
        let tree_oid = git2::Oid::from_str(tree_id).map_err(|e| GitError::from_git2(e, tree_id))?;
        let tree = self.repo.find_tree(tree_oid).map_err(GitError::from)?;

        let first = self.find_commit(parents[0])?;
        let second = self.find_commit(parents[1])?;

        let signature = git2::Signature::now(name, email).map_err(GitError::from)?;

        let oid = self
            .repo
            .commit(None, &signature, &signature, message, &tree, &[&first, &second])
            .map_err(GitError::from)?;

        Ok(CommitId::new(oid.to_string())?)
    }

    // =========================================================================
    // Branch Update and Push
    // =========================================================================

    /// Point the local branch ref at `commit` (creating it if needed).
    pub fn set_local_branch(&self, branch: &BranchName, commit: &CommitId) -> Result<(), GitError> {
        let oid = self.oid(commit)?;
        self.repo
            .reference(&branch.local_ref(), oid, true, "git-json-api: update branch")
            .map_err(|e| GitError::from_git2(e, &branch.local_ref()))?;
        Ok(())
    }

    /// Push the local branch to `origin`.
    ///
    /// A successful push also advances the remote-tracking ref, which is
    /// what [`Git::branch_tips`] compares for post-push verification.
    pub fn push_origin(&self, branch: &BranchName) -> Result<(), GitError> {
        let mut remote = self
            .repo
            .find_remote("origin")
            .map_err(|e| GitError::from_git2(e, "origin"))?;

        let refspec = format!("{}:{}", branch.local_ref(), branch.local_ref());
        remote.push(&[refspec.as_str()], None).map_err(|e| GitError::Internal {
            message: format!("push {}: {}", branch, e.message()),
        })
    }

    /// Resolve the local and remote-tracking tips of a branch.
    pub fn branch_tips(
        &self,
        branch: &BranchName,
    ) -> Result<(Option<CommitId>, Option<CommitId>), GitError> {
        let local = self.try_resolve_ref(&branch.local_ref())?;
        let remote = self.try_resolve_ref(&branch.remote_ref())?;
        Ok((local, remote))
    }

    // =========================================================================
    // Internal
    // =========================================================================

    fn oid(&self, commit: &CommitId) -> Result<git2::Oid, GitError> {
        git2::Oid::from_str(commit.as_str()).map_err(|e| GitError::from_git2(e, commit.as_str()))
    }

    fn find_commit(&self, commit: &CommitId) -> Result<git2::Commit<'_>, GitError> {
        let oid = self.oid(commit)?;
        self.repo
            .find_commit(oid)
            .map_err(|e| GitError::from_git2(e, commit.as_str()))
    }
}

/// Collect conflicted paths from a merge index, de-duplicated, in the
/// order the index reports them.
fn conflicted_paths(index: &git2::Index) -> Result<Vec<String>, GitError> {
    let mut paths = Vec::new();
    for conflict in index.conflicts().map_err(GitError::from)? {
        let conflict = conflict.map_err(GitError::from)?;
        let entry = conflict
            .our
            .as_ref()
            .or(conflict.their.as_ref())
            .or(conflict.ancestor.as_ref());
        if let Some(entry) = entry {
            if let Ok(path) = std::str::from_utf8(&entry.path) {
                if !paths.iter().any(|p| p == path) {
                    paths.push(path.to_string());
                }
            }
        }
    }
    Ok(paths)
}

/// Extract the `<<<<<<<` .. `>>>>>>>` delimited regions from file content,
/// delimiters included.
fn extract_conflict_markers(content: &str) -> String {
    let mut out = String::new();
    let mut in_conflict = false;
    for line in content.lines() {
        if line.starts_with("<<<<<<<") {
            in_conflict = true;
        }
        if in_conflict {
            out.push_str(line);
            out.push('\n');
        }
        if line.starts_with(">>>>>>>") {
            in_conflict = false;
        }
    }
    out
}
