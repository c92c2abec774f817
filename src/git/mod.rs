//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **only doorway** to Git. All repository reads and
//! writes flow through this interface; no other module imports `git2`.
//! We use the `git2` crate exclusively (no shelling out to the git CLI).
//!
//! # Responsibilities
//!
//! - Open-or-clone of the local working copy
//! - Fetch with pruning
//! - Ref and commit resolution
//! - Tree enumeration and blob reads
//! - Detached checkout, workdir diff, commit creation
//! - Ancestry queries and three-way merges with conflict reporting
//! - Push with post-push ref comparison
//!
//! # Invariants
//!
//! - All operations return strong types ([`CommitId`], [`BranchName`])
//! - Errors are normalized into typed [`GitError`] categories

mod interface;

pub use interface::{Git, GitError, MergeOutcome, TreeFile};
