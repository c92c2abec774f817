//! repo::lock
//!
//! FIFO mutual-exclusion gate for the shared working copy.
//!
//! # Architecture
//!
//! Every operation that touches the local repository (fetch, checkout,
//! commit, merge, push) runs under this lock; the working copy, index, and
//! HEAD are mutable shared state with no per-request isolation. The lock is
//! an explicit resource owned by the repo facade - there is no process-wide
//! singleton, so multiple independent repositories can coexist in one
//! process (and in tests).
//!
//! # Semantics
//!
//! - Waiters are queued and served in FIFO order
//! - Acquisition completes immediately when the lock is free
//! - Release is guaranteed on every exit path via the RAII guard
//! - No reentrancy, no priority, and deliberately no timeout: a hung
//!   operation starves all queued callers; adding a queue deadline is a
//!   known hardening gap
//!
//! # Example
//!
//! ```
//! use git_json_api::repo::lock::OperationLock;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let lock = OperationLock::new(0u32);
//!
//! let mut guard = lock.acquire().await;
//! *guard += 1;
//! // released when `guard` drops
//! # }
//! ```

use tokio::sync::{Mutex, MutexGuard};

/// A FIFO mutual-exclusion gate protecting repository state `T`.
///
/// Built on tokio's fair mutex: waiters acquire in the order they queued,
/// which is exactly the serialization contract the shared working copy
/// requires.
#[derive(Debug)]
pub struct OperationLock<T> {
    inner: Mutex<T>,
}

/// RAII guard over the protected state. The lock is released when the
/// guard drops, on success and failure paths alike.
pub type OperationGuard<'a, T> = MutexGuard<'a, T>;

impl<T> OperationLock<T> {
    /// Create a lock owning `state`.
    pub fn new(state: T) -> Self {
        Self {
            inner: Mutex::new(state),
        }
    }

    /// Acquire the lock, suspending until it is this caller's turn.
    pub async fn acquire(&self) -> OperationGuard<'_, T> {
        self.inner.lock().await
    }

    /// Acquire the lock from blocking (non-async) context.
    ///
    /// Repository operations run on the blocking thread pool so the
    /// runtime's worker threads never stall on git I/O; those threads take
    /// the lock through this entry point. Must not be called from async
    /// context.
    pub fn blocking_acquire(&self) -> OperationGuard<'_, T> {
        self.inner.blocking_lock()
    }
}
