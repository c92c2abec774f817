//! repo::cache
//!
//! Snapshot cache: two queryable in-memory views of one commit's JSON
//! files.
//!
//! # Views
//!
//! - **nested document**: mirrors the directory structure; a file
//!   `dir/leaf.json` becomes the node at `dir.leaf`
//! - **flat file map**: repository path (extension stripped) -> document
//!
//! Both views are derived from exactly one commit and rebuilt only when a
//! different commit is requested. Each file is parsed once per view so the
//! two projections never share data a caller could cross-mutate.
//!
//! # Index files
//!
//! A file named `index.json` inside directory `D` contributes its parsed
//! object to `D`'s node itself rather than a child named `index`. Literal
//! sibling files win over index-supplied keys; non-object index content at
//! an already-populated node is ignored.
//!
//! # Concurrency
//!
//! The cache needs no locking of its own: it is only ever touched while
//! the repo's operation lock is held.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::core::error::ApiError;
use crate::core::types::CommitId;
use crate::core::vars::ContentVars;
use crate::git::{Git, TreeFile};

/// Cache of the nested and flat projections of the last requested commit.
#[derive(Debug)]
pub struct SnapshotCache {
    commit_id: Option<CommitId>,
    object: Value,
    files: BTreeMap<String, Value>,
    vars: ContentVars,
}

impl SnapshotCache {
    /// Create an empty cache. `vars` are substituted into file content
    /// before parsing.
    pub fn new(vars: ContentVars) -> Self {
        Self {
            commit_id: None,
            object: Value::Object(Map::new()),
            files: BTreeMap::new(),
            vars,
        }
    }

    /// The commit the current views were built from, if any.
    pub fn commit_id(&self) -> Option<&CommitId> {
        self.commit_id.as_ref()
    }

    /// (Re)build the views for `commit`. No-op when `commit` is already
    /// cached.
    pub fn update(&mut self, git: &Git, commit: &CommitId) -> Result<(), ApiError> {
        if self.commit_id.as_ref() == Some(commit) {
            return Ok(());
        }

        let entries = git.json_files(commit)?;
        let (object, files) = build_views(&entries, &self.vars)?;

        self.commit_id = Some(commit.clone());
        self.object = object;
        self.files = files;

        Ok(())
    }

    /// The node at `path` in the nested document (the root for an empty
    /// path).
    ///
    /// # Errors
    ///
    /// [`ApiError::NotFound`] if no node exists at `path`.
    pub fn document(&self, path: &str) -> Result<Value, ApiError> {
        if path.is_empty() {
            return Ok(self.object.clone());
        }

        let mut node = &self.object;
        for segment in path.split('/') {
            node = node
                .as_object()
                .and_then(|map| map.get(segment))
                .ok_or_else(|| ApiError::NotFound("not found".to_string()))?;
        }

        Ok(node.clone())
    }

    /// The flat entries strictly under `path`, prefix stripped (the whole
    /// map for an empty path).
    ///
    /// # Errors
    ///
    /// [`ApiError::NotFound`] if the selection is empty - including when
    /// `path` names a leaf file rather than a directory.
    pub fn files(&self, path: &str) -> Result<Value, ApiError> {
        if path.is_empty() {
            let map: Map<String, Value> = self
                .files
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            return Ok(Value::Object(map));
        }

        let prefix = format!("{path}/");
        let map: Map<String, Value> = self
            .files
            .iter()
            .filter_map(|(k, v)| {
                k.strip_prefix(&prefix)
                    .map(|stripped| (stripped.to_string(), v.clone()))
            })
            .collect();

        if map.is_empty() {
            return Err(ApiError::NotFound("not found".to_string()));
        }

        Ok(Value::Object(map))
    }
}

/// Build both projections from the breadth-first file listing.
///
/// Later entries at the same logical path overwrite earlier ones, which
/// combined with the breadth-first order gives deeper files precedence.
fn build_views(
    entries: &[TreeFile],
    vars: &ContentVars,
) -> Result<(Value, BTreeMap<String, Value>), ApiError> {
    let mut object = Value::Object(Map::new());
    let mut files = BTreeMap::new();

    for entry in entries {
        let content = vars.replace_variables_with_values(&entry.content);
        let logical = strip_extension(&entry.path);

        // parse twice so the two views hold independent data
        let file_value = parse_lenient(&content, &entry.path)?;
        files.insert(logical.to_string(), parse_lenient(&content, &entry.path)?);

        let mut segments: Vec<&str> = logical.split('/').collect();
        let is_index = segments.last() == Some(&"index");
        if is_index {
            segments.pop();
            merge_index(&mut object, &segments, file_value);
        } else {
            set_path(&mut object, &segments, file_value);
        }
    }

    Ok((object, files))
}

fn parse_lenient(content: &str, path: &str) -> Result<Value, ApiError> {
    json5::from_str(content)
        .map_err(|e| ApiError::Internal(format!("cannot parse '{path}': {e}")))
}

fn strip_extension(path: &str) -> &str {
    path.strip_suffix(".json").unwrap_or(path)
}

/// Place `value` at `segments`, creating (or replacing) intermediate
/// object nodes as needed. An empty segment list replaces the root.
fn set_path(root: &mut Value, segments: &[&str], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        *root = value;
        return;
    };

    let mut node = root;
    for segment in parents {
        node = ensure_object(node)
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    ensure_object(node).insert(last.to_string(), value);
}

/// Coerce a node into an object, replacing non-object content.
fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just made an object"),
    }
}

/// Merge an `index` file's content into the directory node at `segments`.
///
/// When the node does not exist yet, the index content becomes the node.
/// Otherwise object content is shallow-merged with existing keys winning;
/// non-object content is ignored.
fn merge_index(root: &mut Value, segments: &[&str], value: Value) {
    if !path_exists(root, segments) {
        set_path(root, segments, value);
        return;
    }

    if let Some(node) = get_path(root, segments) {
        if let (Some(incoming), Some(target)) = (value.as_object(), node.as_object_mut()) {
            for (key, val) in incoming {
                if !target.contains_key(key) {
                    target.insert(key.clone(), val.clone());
                }
            }
        }
    }
}

fn path_exists(root: &Value, segments: &[&str]) -> bool {
    let mut node = root;
    for segment in segments {
        match node.as_object().and_then(|map| map.get(*segment)) {
            Some(next) => node = next,
            None => return false,
        }
    }
    true
}

fn get_path<'a>(root: &'a mut Value, segments: &[&str]) -> Option<&'a mut Value> {
    let mut node = root;
    for segment in segments {
        node = node.as_object_mut()?.get_mut(*segment)?;
    }
    Some(node)
}
