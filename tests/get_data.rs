//! Read-path integration tests.
//!
//! These tests use real git repositories created via tempfile to verify
//! version resolution, snapshot building, and the two query styles
//! end-to-end.

mod common;

use serde_json::json;

use git_json_api::core::error::ApiError;
use git_json_api::core::types::CommitId;
use git_json_api::git::Git;
use git_json_api::repo::cache::SnapshotCache;
use git_json_api::core::vars::ContentVars;

use common::TestOrigin;

fn seeded_origin() -> TestOrigin {
    let mut origin = TestOrigin::new();
    origin.commit_file(
        "rootFile.json",
        &json!({"foo": "bar", "number": {"baz": "foo"}}),
    );
    origin.commit_file("dir/nestedFile1.json", &json!({"foo": "bar", "number": 1}));
    origin.push();
    origin.commit_file("dir/nestedFile2.json", &json!(["one", "two", "three"]));
    origin.push();
    origin
}

#[tokio::test]
async fn returns_complete_data_for_master() {
    let origin = seeded_origin();
    let repo = origin.open_repo().await;

    let result = repo.get_data("master", "", false).await.expect("get data");

    assert_eq!(result.commit_hash.as_str(), origin.head());
    assert_eq!(
        result.data,
        json!({
            "rootFile": {"foo": "bar", "number": {"baz": "foo"}},
            "dir": {
                "nestedFile1": {"foo": "bar", "number": 1},
                "nestedFile2": ["one", "two", "three"],
            },
        })
    );
}

#[tokio::test]
async fn returns_data_of_root_file() {
    let origin = seeded_origin();
    let repo = origin.open_repo().await;

    let result = repo
        .get_data("master", "rootFile", false)
        .await
        .expect("get data");

    assert_eq!(result.data, json!({"foo": "bar", "number": {"baz": "foo"}}));
}

#[tokio::test]
async fn returns_data_of_a_nested_file() {
    let origin = seeded_origin();
    let repo = origin.open_repo().await;

    let result = repo
        .get_data("master", "dir/nestedFile1", false)
        .await
        .expect("get data");

    assert_eq!(result.data, json!({"foo": "bar", "number": 1}));
}

#[tokio::test]
async fn returns_complete_data_for_older_version() {
    let origin = seeded_origin();
    let repo = origin.open_repo().await;

    let older = origin.versions[1].clone();
    let result = repo.get_data(&older, "", false).await.expect("get data");

    assert_eq!(result.commit_hash.as_str(), older);
    assert_eq!(
        result.data,
        json!({
            "rootFile": {"foo": "bar", "number": {"baz": "foo"}},
            "dir": {
                "nestedFile1": {"foo": "bar", "number": 1},
            },
        })
    );
}

#[tokio::test]
async fn lists_files_flat() {
    let origin = seeded_origin();
    let repo = origin.open_repo().await;

    let result = repo.get_data("master", "", true).await.expect("get data");

    assert_eq!(
        result.data,
        json!({
            "rootFile": {"foo": "bar", "number": {"baz": "foo"}},
            "dir/nestedFile1": {"foo": "bar", "number": 1},
            "dir/nestedFile2": ["one", "two", "three"],
        })
    );
}

#[tokio::test]
async fn lists_files_under_a_directory_with_prefix_stripped() {
    let origin = seeded_origin();
    let repo = origin.open_repo().await;

    let result = repo.get_data("master", "dir", true).await.expect("get data");

    assert_eq!(
        result.data,
        json!({
            "nestedFile1": {"foo": "bar", "number": 1},
            "nestedFile2": ["one", "two", "three"],
        })
    );
}

#[tokio::test]
async fn listing_files_of_a_leaf_path_is_not_found() {
    let origin = seeded_origin();
    let repo = origin.open_repo().await;

    let result = repo.get_data("master", "rootFile", true).await;
    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

#[tokio::test]
async fn missing_document_path_is_not_found() {
    let origin = seeded_origin();
    let repo = origin.open_repo().await;

    let result = repo.get_data("master", "does/not/exist", false).await;
    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

#[tokio::test]
async fn unknown_version_token_embeds_token_in_error() {
    let origin = seeded_origin();
    let repo = origin.open_repo().await;

    let result = repo.get_data("doesnotexist", "", false).await;
    match result {
        Err(ApiError::NotFound(message)) => {
            assert_eq!(message, "could not find branch or commit 'doesnotexist'");
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn index_files_merge_into_their_directory() {
    let mut origin = TestOrigin::new();
    origin.commit_file("dir/index.json", &json!({"title": "Dir", "name": "ignored"}));
    origin.commit_file("dir/name.json", &json!("from sibling"));
    origin.push();
    let repo = origin.open_repo().await;

    let result = repo.get_data("master", "dir", false).await.expect("get data");

    // sibling files win over index-supplied keys
    assert_eq!(result.data, json!({"title": "Dir", "name": "from sibling"}));
}

#[test]
fn cache_update_is_idempotent_for_the_cached_commit() {
    let mut origin = TestOrigin::new();
    origin.commit_file("a.json", &json!({"x": 1}));
    origin.push();

    let clone_dir = origin.origin_path().parent().unwrap().join("cache-clone");
    let git = Git::open_or_clone(&clone_dir, origin.origin_path().to_str().unwrap())
        .expect("clone for cache test");
    let commit = CommitId::new(origin.head()).expect("commit id");

    let mut cache = SnapshotCache::new(ContentVars::default());
    cache.update(&git, &commit).expect("first update");
    assert_eq!(cache.commit_id(), Some(&commit));

    // A repository that does not contain the commit would fail any rebuild;
    // the second update must not touch it at all.
    let empty_dir = origin.origin_path().parent().unwrap().join("empty");
    std::fs::create_dir_all(&empty_dir).expect("create empty dir");
    common::run_git(&empty_dir, &["init"]);
    let empty = Git::open_or_clone(&empty_dir, empty_dir.to_str().unwrap()).expect("open empty");

    cache.update(&empty, &commit).expect("second update is a no-op");
    assert_eq!(cache.commit_id(), Some(&commit));
    assert_eq!(cache.document("a").expect("cached view intact"), json!({"x": 1}));
}
