//! git-json-api - a read/write HTTP API over a git repository of JSON files
//!
//! The service exposes a version-controlled tree of JSON documents through
//! two operations: reading a document (or a flattened file listing) at any
//! branch or commit, and writing new content relative to a known parent
//! version with automatic merging of divergent concurrent writes.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`http`] - HTTP layer (parses requests, delegates to the repo facade)
//! - [`repo`] - Versioned storage engine: facade, snapshot cache,
//!   operation lock, version resolver, and the write engine
//! - [`git`] - Single interface for all Git operations
//! - [`core`] - Domain types, error taxonomy, configuration, content
//!   variables
//!
//! # Correctness Invariants
//!
//! 1. All access to the shared working copy is serialized by the repo's
//!    operation lock, acquired for the entire fetch+read or
//!    fetch+write+push sequence
//! 2. Snapshots are a pure function of one commit; the cache never serves
//!    data from a commit other than the one it was built from
//! 3. A failed write leaves the remote branch exactly as it was - new
//!    commits are pushed only after diff, merge, and conflict checks pass

pub mod core;
pub mod git;
pub mod http;
pub mod repo;
