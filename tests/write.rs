//! Write-path integration tests: no-op detection, fast-forward,
//! ancestry-based merging, conflict reporting, and target branch rules.

mod common;

use std::collections::BTreeMap;

use serde_json::json;

use git_json_api::core::error::ApiError;
use git_json_api::repo::payload::WritePayload;

use common::TestOrigin;

fn single(value: serde_json::Value) -> WritePayload {
    WritePayload::SingleFile(value)
}

fn subtree(entries: &[(&str, serde_json::Value)]) -> WritePayload {
    WritePayload::Subtree(
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect::<BTreeMap<_, _>>(),
    )
}

#[tokio::test]
async fn no_op_write_returns_parent_commit_and_creates_nothing() {
    let mut origin = TestOrigin::new();
    origin.commit_file("rootFile.json", &json!({"foo": "bar"}));
    origin.push();
    let repo = origin.open_repo().await;

    let tip_before = origin.origin_tip("master");
    let result = repo
        .write("master", None, "rootFile", single(json!({"foo": "bar"})), None)
        .await
        .expect("no-op write");

    assert_eq!(result.as_str(), origin.head());
    assert_eq!(origin.origin_tip("master"), tip_before);
}

#[tokio::test]
async fn fast_forward_write_advances_the_branch() {
    let mut origin = TestOrigin::new();
    origin.commit_file("rootFile.json", &json!({"foo": "bar"}));
    origin.push();
    let repo = origin.open_repo().await;

    let result = repo
        .write(
            "master",
            None,
            "rootFile",
            single(json!({"foo": "updated"})),
            Some("Editor"),
        )
        .await
        .expect("write");

    assert_ne!(result.as_str(), origin.head());
    assert_eq!(origin.origin_tip("master"), result.as_str());
    assert_eq!(origin.parent_count(result.as_str()), 1);
    assert_eq!(origin.origin_tip_subject("master"), "Update rootFile");

    let data = repo.get_data("master", "rootFile", false).await.expect("read back");
    assert_eq!(data.data, json!({"foo": "updated"}));
    assert_eq!(data.commit_hash, result);
}

#[tokio::test]
async fn divergent_non_overlapping_writes_merge() {
    let mut origin = TestOrigin::new();
    origin.commit_file("rootFile.json", &json!({"foo": "bar"}));
    origin.push();
    let base = origin.head().to_string();

    // the branch advances with an unrelated change
    origin.commit_file("fileA.json", &json!({"a": "new"}));
    origin.push();

    let repo = origin.open_repo().await;
    let result = repo
        .write(
            &base,
            Some("master"),
            "fileB",
            single(json!({"b": "also new"})),
            None,
        )
        .await
        .expect("merging write");

    // one merge commit with both lines of history as parents
    assert_eq!(origin.origin_tip("master"), result.as_str());
    assert_eq!(origin.parent_count(result.as_str()), 2);

    let data = repo.get_data("master", "", false).await.expect("read back");
    assert_eq!(
        data.data,
        json!({
            "rootFile": {"foo": "bar"},
            "fileA": {"a": "new"},
            "fileB": {"b": "also new"},
        })
    );
}

#[tokio::test]
async fn divergent_overlapping_writes_conflict_with_marker_report() {
    let mut origin = TestOrigin::new();
    origin.commit_file("rootFile.json", &json!({"foo": "original"}));
    origin.push();
    let base = origin.head().to_string();

    origin.commit_file("rootFile.json", &json!({"foo": "remote"}));
    origin.push();
    let advanced_tip = origin.origin_tip("master");

    let repo = origin.open_repo().await;
    let result = repo
        .write(
            &base,
            Some("master"),
            "rootFile",
            single(json!({"foo": "local"})),
            None,
        )
        .await;

    match result {
        Err(ApiError::MergeConflict { report }) => {
            assert!(report.contains("rootFile.json"), "report: {report}");
            assert!(report.contains("<<<<<<<"), "report: {report}");
            assert!(report.contains("======="), "report: {report}");
            assert!(report.contains(">>>>>>>"), "report: {report}");
            assert!(report.contains("remote"), "report: {report}");
            assert!(report.contains("local"), "report: {report}");
        }
        other => panic!("expected MergeConflict, got {other:?}"),
    }

    // a failed write leaves the remote branch exactly as it was
    assert_eq!(origin.origin_tip("master"), advanced_tip);
}

#[tokio::test]
async fn commit_parent_without_explicit_branch_is_rejected() {
    let mut origin = TestOrigin::new();
    origin.commit_file("rootFile.json", &json!({"foo": "bar"}));
    origin.push();
    let base = origin.head().to_string();

    let repo = origin.open_repo().await;
    let result = repo
        .write(&base, None, "rootFile", single(json!({"foo": "x"})), None)
        .await;

    assert!(matches!(result, Err(ApiError::InvalidBranch(_))));
}

#[tokio::test]
async fn commit_parent_with_explicit_branch_is_accepted() {
    let mut origin = TestOrigin::new();
    origin.commit_file("rootFile.json", &json!({"foo": "bar"}));
    origin.push();
    let base = origin.head().to_string();

    let repo = origin.open_repo().await;
    let result = repo
        .write(
            &base,
            Some("master"),
            "rootFile",
            single(json!({"foo": "explicit"})),
            None,
        )
        .await
        .expect("write with explicit branch");

    assert_eq!(origin.origin_tip("master"), result.as_str());
}

#[tokio::test]
async fn nonexistent_target_branch_is_rejected_and_never_created() {
    let mut origin = TestOrigin::new();
    origin.commit_file("rootFile.json", &json!({"foo": "bar"}));
    origin.push();

    let repo = origin.open_repo().await;
    let result = repo
        .write(
            "master",
            Some("feature"),
            "rootFile",
            single(json!({"foo": "x"})),
            None,
        )
        .await;

    assert!(matches!(result, Err(ApiError::InvalidBranch(_))));
    assert!(!origin.branch_exists("feature"));
}

#[tokio::test]
async fn unknown_parent_version_is_not_found() {
    let mut origin = TestOrigin::new();
    origin.commit_file("rootFile.json", &json!({"foo": "bar"}));
    origin.push();

    let repo = origin.open_repo().await;
    let result = repo
        .write(
            "doesnotexist",
            Some("master"),
            "rootFile",
            single(json!({"foo": "x"})),
            None,
        )
        .await;

    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

#[tokio::test]
async fn subtree_write_replaces_the_whole_directory() {
    let mut origin = TestOrigin::new();
    origin.commit_file("rootFile.json", &json!({"foo": "bar"}));
    origin.commit_file("dir/nestedFile1.json", &json!({"n": 1}));
    origin.commit_file("dir/nestedFile2.json", &json!({"n": 2}));
    origin.push();

    let repo = origin.open_repo().await;
    let result = repo
        .write(
            "master",
            None,
            "dir",
            subtree(&[("replacement", json!({"r": true}))]),
            None,
        )
        .await
        .expect("subtree write");

    assert_eq!(origin.origin_tip("master"), result.as_str());

    let data = repo.get_data("master", "", false).await.expect("read back");
    assert_eq!(
        data.data,
        json!({
            "rootFile": {"foo": "bar"},
            "dir": {"replacement": {"r": true}},
        })
    );
}

#[tokio::test]
async fn sequential_divergent_writes_from_the_same_parent_both_survive() {
    let mut origin = TestOrigin::new();
    origin.commit_file("fileA.json", &json!({"a": "old"}));
    origin.commit_file("fileB.json", &json!({"b": "old"}));
    origin.push();
    let base = origin.head().to_string();

    let repo = origin.open_repo().await;

    let first = repo
        .write(&base, Some("master"), "fileA", single(json!({"a": "new"})), None)
        .await
        .expect("first write");
    assert_eq!(origin.parent_count(first.as_str()), 1);

    // second write still references the original parent, so it diverges
    let second = repo
        .write(&base, Some("master"), "fileB", single(json!({"b": "new"})), None)
        .await
        .expect("second write");
    assert_eq!(origin.parent_count(second.as_str()), 2);

    let data = repo.get_data("master", "", false).await.expect("read back");
    assert_eq!(
        data.data,
        json!({
            "fileA": {"a": "new"},
            "fileB": {"b": "new"},
        })
    );
}
