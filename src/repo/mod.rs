//! repo
//!
//! The versioned storage engine: a facade over the version resolver,
//! snapshot cache, operation lock, and write engine.
//!
//! # Operations
//!
//! - [`Repo::get_data`] - read a document or file listing at any version
//! - [`Repo::write`] - integrate new content relative to a parent version
//!   into the target branch
//!
//! Both hold the operation lock for the entire fetch+read or
//! fetch+write+push sequence, all conditional branches included; release
//! on every exit path is guaranteed by RAII. Git work runs on the blocking
//! thread pool so queued requests suspend instead of stalling the runtime.

pub mod cache;
pub mod lock;
pub mod payload;
pub mod resolve;
pub mod write;

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::core::config::{Config, Signature};
use crate::core::error::ApiError;
use crate::core::types::CommitId;
use crate::core::vars::ContentVars;
use crate::git::Git;

use cache::SnapshotCache;
use lock::OperationLock;
use payload::WritePayload;
use resolve::resolve_version;
use write::{WriteEngine, WriteRequestMeta};

/// Result of a read: the resolved commit and the requested projection.
#[derive(Debug)]
pub struct GetData {
    /// The commit the data was derived from.
    pub commit_hash: CommitId,
    /// Document or file listing.
    pub data: Value,
}

/// State protected by the operation lock: the git doorway and the
/// snapshot cache it feeds.
struct RepoState {
    git: Git,
    cache: SnapshotCache,
}

/// The repository facade consumed by the HTTP layer.
///
/// Cheap to clone; all clones share one working copy and one lock.
#[derive(Clone)]
pub struct Repo {
    state: Arc<OperationLock<RepoState>>,
    signature: Signature,
    vars: ContentVars,
}

impl Repo {
    /// Open the local working copy, cloning from the configured remote
    /// when absent.
    pub async fn open(config: &Config) -> Result<Self, ApiError> {
        let uri = config.repo_uri.clone();
        let path = config.repo_path.clone();
        let vars = config.vars.clone();

        let git = tokio::task::spawn_blocking(move || Git::open_or_clone(&path, &uri))
            .await
            .map_err(|e| ApiError::Internal(format!("task join: {e}")))??;

        Ok(Self {
            state: Arc::new(OperationLock::new(RepoState {
                git,
                cache: SnapshotCache::new(vars.clone()),
            })),
            signature: config.signature.clone(),
            vars: config.vars.clone(),
        })
    }

    /// Read the document at `path` (or the flat file listing when
    /// `list_files`) as of `version`.
    pub async fn get_data(
        &self,
        version: &str,
        path: &str,
        list_files: bool,
    ) -> Result<GetData, ApiError> {
        let state = Arc::clone(&self.state);
        let version = version.to_string();
        let path = path.to_string();

        tokio::task::spawn_blocking(move || {
            let mut state = state.blocking_acquire();
            let RepoState { git, cache } = &mut *state;

            git.fetch_origin()?;
            let commit = resolve_version(git, &version)?;
            cache.update(git, &commit)?;

            debug!(%version, %path, commit = %commit.short(7), "serving read");
            let data = if list_files {
                cache.files(&path)?
            } else {
                cache.document(&path)?
            };

            Ok(GetData {
                commit_hash: commit,
                data,
            })
        })
        .await
        .map_err(|e| ApiError::Internal(format!("task join: {e}")))?
    }

    /// Integrate `payload` at `path`, based on `parent_version`, into the
    /// target branch. Returns the resulting commit id.
    pub async fn write(
        &self,
        parent_version: &str,
        target_branch: Option<&str>,
        path: &str,
        payload: WritePayload,
        author: Option<&str>,
    ) -> Result<CommitId, ApiError> {
        let state = Arc::clone(&self.state);
        let signature = self.signature.clone();
        let vars = self.vars.clone();
        let parent_version = parent_version.to_string();
        let target_branch = target_branch.map(str::to_string);
        let path = path.to_string();
        let author = author.map(str::to_string);

        tokio::task::spawn_blocking(move || {
            let state = state.blocking_acquire();

            let engine = WriteEngine::new(&state.git, &signature, &vars);
            let meta = WriteRequestMeta {
                parent_version: &parent_version,
                target_branch: target_branch.as_deref(),
                path: &path,
                author: author.as_deref(),
            };
            engine.execute(&meta, &payload)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("task join: {e}")))?
    }
}
