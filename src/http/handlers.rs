//! http::handlers
//!
//! axum handlers for the read and write routes.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::core::error::ApiError;
use crate::core::types::CommitId;
use crate::repo::payload::WriteRequest;
use crate::repo::Repo;

/// Response header naming the commit the data corresponds to.
const COMMIT_HEADER: HeaderName = HeaderName::from_static("git-commit-hash");

/// Query parameters for reads.
#[derive(Debug, Default, Deserialize)]
pub struct GetQuery {
    /// Return the flat file listing instead of the nested document.
    #[serde(default, rename = "listFiles")]
    list_files: bool,
}

/// Query parameters for writes.
#[derive(Debug, Default, Deserialize)]
pub struct PutQuery {
    /// Target branch; defaults to the parent version when that names a
    /// branch.
    branch: Option<String>,
    /// Display name attributed as the commit author.
    author: Option<String>,
}

/// `GET /{version}`
pub async fn get_root(
    State(repo): State<Repo>,
    Path(version): Path<String>,
    Query(query): Query<GetQuery>,
) -> Result<Response, ErrorResponse> {
    get_data(repo, &version, "", query).await
}

/// `GET /{version}/{*path}`
pub async fn get_path(
    State(repo): State<Repo>,
    Path((version, path)): Path<(String, String)>,
    Query(query): Query<GetQuery>,
) -> Result<Response, ErrorResponse> {
    get_data(repo, &version, &path, query).await
}

/// `PUT /{version}`
pub async fn put_root(
    State(repo): State<Repo>,
    Path(version): Path<String>,
    Query(query): Query<PutQuery>,
    Json(body): Json<WriteRequest>,
) -> Result<Response, ErrorResponse> {
    write(repo, &version, "", query, body).await
}

/// `PUT /{version}/{*path}`
pub async fn put_path(
    State(repo): State<Repo>,
    Path((version, path)): Path<(String, String)>,
    Query(query): Query<PutQuery>,
    Json(body): Json<WriteRequest>,
) -> Result<Response, ErrorResponse> {
    write(repo, &version, &path, query, body).await
}

async fn get_data(
    repo: Repo,
    version: &str,
    path: &str,
    query: GetQuery,
) -> Result<Response, ErrorResponse> {
    let result = repo.get_data(version, path, query.list_files).await?;
    Ok(with_commit_header(result.commit_hash, Json(result.data)))
}

async fn write(
    repo: Repo,
    version: &str,
    path: &str,
    query: PutQuery,
    body: WriteRequest,
) -> Result<Response, ErrorResponse> {
    let payload = body.into_payload()?;
    let commit = repo
        .write(
            version,
            query.branch.as_deref(),
            path,
            payload,
            query.author.as_deref(),
        )
        .await?;

    let body = Json(json!({ "commitHash": commit.as_str() }));
    Ok(with_commit_header(commit, body))
}

fn with_commit_header(commit: CommitId, body: impl IntoResponse) -> Response {
    ([(COMMIT_HEADER, commit.to_string())], body).into_response()
}

/// Maps the error taxonomy to status codes. Only the taxonomy message is
/// exposed; internal details stay in the logs.
#[derive(Debug)]
pub struct ErrorResponse(ApiError);

impl From<ApiError> for ErrorResponse {
    fn from(err: ApiError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::InvalidBranch(_) => StatusCode::BAD_REQUEST,
            ApiError::MergeConflict { .. } => StatusCode::CONFLICT,
            ApiError::PushFailed { .. } => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }

        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
