//! http
//!
//! HTTP layer: routing and request/response mapping.
//!
//! # Responsibilities
//!
//! - Parse path, query, and body into typed inputs
//! - Delegate to the [`crate::repo`] facade
//! - Map the error taxonomy to status codes
//!
//! The layer is thin by design: it performs no repository work itself and
//! never exposes internals beyond the taxonomy message.
//!
//! # Routes
//!
//! - `GET /{version}` and `GET /{version}/{*path}` - read a document, or
//!   a flat file listing with `?listFiles=true`
//! - `PUT /{version}` and `PUT /{version}/{*path}` - write relative to
//!   `{version}`; `?branch=` selects the target branch, `?author=`
//!   attributes the commit
//!
//! Every successful response carries a `Git-Commit-Hash` header.

mod handlers;

use axum::routing::get;
use axum::Router;

use crate::repo::Repo;

/// Build the service router.
pub fn router(repo: Repo) -> Router {
    Router::new()
        .route(
            "/{version}",
            get(handlers::get_root).put(handlers::put_root),
        )
        .route(
            "/{version}/{*path}",
            get(handlers::get_path).put(handlers::put_path),
        )
        .with_state(repo)
}
