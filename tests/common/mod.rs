//! Shared test fixture: a bare origin repository seeded through a working
//! clone, and a service configuration pointing at it.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

use git_json_api::core::config::{Config, Signature};
use git_json_api::core::vars::ContentVars;
use git_json_api::repo::Repo;

/// A bare origin plus a working clone used to seed test data.
pub struct TestOrigin {
    dir: TempDir,
    origin: PathBuf,
    work: PathBuf,
    clone: PathBuf,
    /// Commit ids recorded after every seeded commit, oldest first.
    pub versions: Vec<String>,
}

impl TestOrigin {
    /// Create a bare origin with `master` as its default branch.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let origin = dir.path().join("origin.git");
        let work = dir.path().join("work");
        let clone = dir.path().join("clone");

        std::fs::create_dir(&origin).expect("create origin dir");
        run_git(&origin, &["init", "--bare"]);
        run_git(&origin, &["symbolic-ref", "HEAD", "refs/heads/master"]);

        run_git(
            dir.path(),
            &["clone", origin.to_str().unwrap(), work.to_str().unwrap()],
        );
        run_git(&work, &["config", "user.email", "test@example.com"]);
        run_git(&work, &["config", "user.name", "Test User"]);
        run_git(&work, &["checkout", "-B", "master"]);

        Self {
            dir,
            origin,
            work,
            clone,
            versions: Vec::new(),
        }
    }

    /// Path of the bare origin repository.
    pub fn origin_path(&self) -> &Path {
        &self.origin
    }

    /// Write a JSON document into the working clone and commit it.
    /// Returns the new commit id.
    pub fn commit_file(&mut self, path: &str, value: &Value) -> String {
        let file = self.work.join(path);
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        let pretty = serde_json::to_string_pretty(value).expect("serialize");
        std::fs::write(&file, format!("{pretty}\n")).expect("write file");

        run_git(&self.work, &["add", path]);
        run_git(&self.work, &["commit", "-m", &format!("Add {path}")]);

        let id = run_git_capture(&self.work, &["rev-parse", "HEAD"]);
        self.versions.push(id.clone());
        id
    }

    /// Push the working clone's master to the origin.
    pub fn push(&self) {
        run_git(&self.work, &["push", "origin", "master"]);
    }

    /// Refresh the working clone after the service pushed to the origin.
    pub fn pull(&self) {
        run_git(&self.work, &["pull", "origin", "master"]);
    }

    /// The last seeded commit id.
    pub fn head(&self) -> &str {
        self.versions.last().expect("no commits seeded")
    }

    /// The origin's current tip of `branch`.
    pub fn origin_tip(&self, branch: &str) -> String {
        run_git_capture(&self.origin, &["rev-parse", branch])
    }

    /// Subject line of the origin's tip commit on `branch`.
    pub fn origin_tip_subject(&self, branch: &str) -> String {
        run_git_capture(&self.origin, &["log", "-1", "--format=%s", branch])
    }

    /// Whether the origin has a branch of the given name.
    pub fn branch_exists(&self, branch: &str) -> bool {
        Command::new("git")
            .args(["rev-parse", "--verify", "--quiet", branch])
            .current_dir(&self.origin)
            .output()
            .expect("git rev-parse failed to start")
            .status
            .success()
    }

    /// Parent count of a commit in the origin.
    pub fn parent_count(&self, commit: &str) -> usize {
        run_git_capture(&self.origin, &["rev-list", "--parents", "-n", "1", commit])
            .split_whitespace()
            .count()
            - 1
    }

    /// Service configuration pointing at this origin.
    pub fn config(&self) -> Config {
        Config {
            repo_uri: self.origin.to_str().unwrap().to_string(),
            repo_path: self.clone.clone(),
            port: 0,
            signature: Signature::default(),
            vars: ContentVars::default(),
        }
    }

    /// Open the service repo facade against this origin.
    pub async fn open_repo(&self) -> Repo {
        Repo::open(&self.config()).await.expect("open repo")
    }
}

/// Run a git command in the given directory, panicking on failure.
pub fn run_git(dir: &Path, args: &[&str]) {
    run_git_capture(dir, args);
}

/// Run a git command and capture trimmed stdout.
pub fn run_git_capture(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed to start");

    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    String::from_utf8(output.stdout)
        .expect("git output not UTF-8")
        .trim()
        .to_string()
}
