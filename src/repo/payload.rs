//! repo::payload
//!
//! Write payload shape, validated at the boundary.
//!
//! The wire format is a JSON object with either a `files` map (replace a
//! whole subtree, one document per key) or a `content` document (replace a
//! single file). The dynamic either/or is modeled as a tagged variant so
//! the write engine never sees an ambiguous request.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::core::error::ApiError;

/// Raw request body for a write.
#[derive(Debug, Clone, Deserialize)]
pub struct WriteRequest {
    /// Full-subtree replacement: filename (extension-less) -> document.
    #[serde(default)]
    pub files: Option<BTreeMap<String, Value>>,
    /// Single-file replacement.
    #[serde(default)]
    pub content: Option<Value>,
}

/// Validated write payload.
#[derive(Debug, Clone)]
pub enum WritePayload {
    /// Replace the subtree at the request path.
    Subtree(BTreeMap<String, Value>),
    /// Replace the single file at the request path.
    SingleFile(Value),
}

impl WriteRequest {
    /// Validate into the tagged variant.
    ///
    /// # Errors
    ///
    /// [`ApiError::BadRequest`] when neither or both of `files` and
    /// `content` are supplied.
    pub fn into_payload(self) -> Result<WritePayload, ApiError> {
        match (self.files, self.content) {
            (Some(files), None) => Ok(WritePayload::Subtree(files)),
            (None, Some(content)) => Ok(WritePayload::SingleFile(content)),
            (None, None) => Err(ApiError::BadRequest(
                "body must contain either 'files' or 'content'".to_string(),
            )),
            (Some(_), Some(_)) => Err(ApiError::BadRequest(
                "body cannot contain both 'files' and 'content'".to_string(),
            )),
        }
    }
}
