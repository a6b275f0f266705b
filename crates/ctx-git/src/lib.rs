// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Subprocess-only adapter onto a local `git` checkout.
//!
//! This is the only component in the workspace that shells out. Every
//! operation captures both stdout and stderr and surfaces stderr in the
//! error message on a non-zero exit.

use chrono::{DateTime, Utc};
use ctx_error::{CtxError, ErrorCode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Metadata for a single commit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommitMeta {
    /// Full commit SHA.
    pub sha: String,
    /// First parent's SHA, empty for a root commit.
    pub parent_sha: String,
    /// Author name.
    pub author: String,
    /// Author timestamp, ISO-8601/RFC-3339.
    pub authored_at: DateTime<Utc>,
    /// Commit subject line.
    pub subject: String,
}

/// The result of diffing two trees: rename is modeled as delete+add, copy
/// as add only.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChangeSet {
    /// Paths added between base and head.
    pub added: Vec<String>,
    /// Paths present in both with different content.
    pub modified: Vec<String>,
    /// Paths present in base but not head.
    pub deleted: Vec<String>,
}

/// A handle onto a git repository, rooted at its working directory.
#[derive(Debug, Clone)]
pub struct GitRepo {
    dir: PathBuf,
}

impl GitRepo {
    /// Open a handle at `dir`. Does not verify `dir` is a git repository;
    /// the first operation will fail if it is not.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The current `HEAD` commit SHA.
    pub fn head_sha(&self) -> Result<String, CtxError> {
        Ok(self.run(&["rev-parse", "HEAD"])?.trim().to_string())
    }

    /// The repository's working-tree root, as an absolute path.
    pub fn repo_root(&self) -> Result<PathBuf, CtxError> {
        let out = self.run(&["rev-parse", "--show-toplevel"])?;
        Ok(PathBuf::from(out.trim()))
    }

    /// Metadata for a single commit.
    pub fn commit_metadata(&self, sha: &str) -> Result<CommitMeta, CtxError> {
        let format = "%H%x09%P%x09%an%x09%aI%x09%s";
        let out = self.run(&["show", "-s", &format!("--format={format}"), sha])?;
        let line = out.lines().next().unwrap_or_default();
        let mut fields = line.split('\t');

        let sha = fields.next().unwrap_or_default().to_string();
        let parents = fields.next().unwrap_or_default();
        let parent_sha = parents.split_whitespace().next().unwrap_or_default().to_string();
        let author = fields.next().unwrap_or_default().to_string();
        let authored_at_raw = fields.next().unwrap_or_default();
        let subject = fields.next().unwrap_or_default().to_string();

        let authored_at = DateTime::parse_from_rfc3339(authored_at_raw)
            .map_err(|e| {
                CtxError::new(ErrorCode::GitSubprocessFailed, "unparsable commit author-time")
                    .with_context("raw", authored_at_raw)
                    .with_context("error", e.to_string())
            })?
            .with_timezone(&Utc);

        Ok(CommitMeta {
            sha,
            parent_sha,
            author,
            authored_at,
            subject,
        })
    }

    /// List every file path tracked at `sha`.
    pub fn list_files_at_commit(&self, sha: &str) -> Result<Vec<String>, CtxError> {
        let out = self.run(&["ls-tree", "-r", "--name-only", sha])?;
        Ok(out.lines().filter(|l| !l.is_empty()).map(str::to_string).collect())
    }

    /// Read a file's raw content at `sha`.
    pub fn read_file_at_commit(&self, sha: &str, path: &str) -> Result<Vec<u8>, CtxError> {
        self.run_bytes(&["show", &format!("{sha}:{path}")])
    }

    /// Read the git blob object id for `path` at `sha`.
    pub fn blob_id_at(&self, sha: &str, path: &str) -> Result<String, CtxError> {
        let out = self.run(&["ls-tree", sha, "--", path])?;
        let line = out.lines().next().ok_or_else(|| {
            CtxError::new(ErrorCode::GitSubprocessFailed, "path not found at commit")
                .with_context("sha", sha)
                .with_context("path", path)
        })?;
        // "<mode> <type> <hash>\t<path>"
        let meta = line.split('\t').next().unwrap_or_default();
        let hash = meta.split_whitespace().nth(2).unwrap_or_default();
        Ok(hash.to_string())
    }

    /// Diff two trees, modeling a rename as delete+add and a copy as add.
    pub fn diff_tree(&self, base: &str, head: &str) -> Result<ChangeSet, CtxError> {
        let out = self.run(&[
            "diff",
            "--name-status",
            "--find-renames",
            "--find-copies",
            base,
            head,
        ])?;

        let mut set = ChangeSet::default();
        for line in out.lines().filter(|l| !l.is_empty()) {
            let mut parts = line.split('\t');
            let status = parts.next().unwrap_or_default();
            let kind = status.chars().next().unwrap_or(' ');
            match kind {
                'A' => {
                    if let Some(p) = parts.next() {
                        set.added.push(p.to_string());
                    }
                }
                'M' => {
                    if let Some(p) = parts.next() {
                        set.modified.push(p.to_string());
                    }
                }
                'D' => {
                    if let Some(p) = parts.next() {
                        set.deleted.push(p.to_string());
                    }
                }
                'R' => {
                    let from = parts.next().unwrap_or_default().to_string();
                    if let Some(to) = parts.next() {
                        set.deleted.push(from);
                        set.added.push(to.to_string());
                    }
                }
                'C' => {
                    let _from = parts.next();
                    if let Some(to) = parts.next() {
                        set.added.push(to.to_string());
                    }
                }
                _ => {}
            }
        }
        set.added.sort();
        set.modified.sort();
        set.deleted.sort();
        Ok(set)
    }

    /// List commit SHAs in `base..head`, oldest first.
    pub fn commits_in_range(&self, base: &str, head: &str) -> Result<Vec<String>, CtxError> {
        let range = format!("{base}..{head}");
        let out = self.run(&["log", "--format=%H", "--date-order", "--reverse", &range])?;
        Ok(out.lines().filter(|l| !l.is_empty()).map(str::to_string).collect())
    }

    fn run(&self, args: &[&str]) -> Result<String, CtxError> {
        let bytes = self.run_bytes(args)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn run_bytes(&self, args: &[&str]) -> Result<Vec<u8>, CtxError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.dir)
            .output()
            .map_err(|e| {
                CtxError::new(ErrorCode::GitSubprocessFailed, "failed to spawn git")
                    .with_context("args", args.join(" "))
                    .with_context("error", e.to_string())
            })?;

        if !output.status.success() {
            return Err(
                CtxError::new(ErrorCode::GitSubprocessFailed, "git exited with an error")
                    .with_context("args", args.join(" "))
                    .with_context("stderr", String::from_utf8_lossy(&output.stderr).into_owned())
                    .with_context("code", output.status.code().unwrap_or(-1)),
            );
        }
        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_repo(dir: &Path) {
        Command::new("git").args(["init", "-q"]).current_dir(dir).status().unwrap();
        Command::new("git")
            .args(["-c", "user.name=t", "-c", "user.email=t@t", "config", "commit.gpgsign", "false"])
            .current_dir(dir)
            .status()
            .unwrap();
    }

    fn commit_all(dir: &Path, message: &str) -> String {
        Command::new("git").args(["add", "-A"]).current_dir(dir).status().unwrap();
        Command::new("git")
            .args(["-c", "user.name=t", "-c", "user.email=t@t", "commit", "-qm", message])
            .current_dir(dir)
            .status()
            .unwrap();
        let out = Command::new("git")
            .args(["rev-parse", "HEAD"])
            .current_dir(dir)
            .output()
            .unwrap();
        String::from_utf8_lossy(&out.stdout).trim().to_string()
    }

    #[test]
    fn head_sha_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());
        std::fs::write(dir.path().join("a.txt"), "hello").unwrap();
        let sha = commit_all(dir.path(), "initial commit");

        let repo = GitRepo::new(dir.path());
        assert_eq!(repo.head_sha().unwrap(), sha);

        let meta = repo.commit_metadata(&sha).unwrap();
        assert_eq!(meta.sha, sha);
        assert_eq!(meta.subject, "initial commit");
        assert!(meta.parent_sha.is_empty());
    }

    #[test]
    fn list_and_read_files_at_commit() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());
        std::fs::write(dir.path().join("a.txt"), "hello").unwrap();
        let sha = commit_all(dir.path(), "c1");

        let repo = GitRepo::new(dir.path());
        let files = repo.list_files_at_commit(&sha).unwrap();
        assert_eq!(files, vec!["a.txt".to_string()]);
        assert_eq!(repo.read_file_at_commit(&sha, "a.txt").unwrap(), b"hello");
    }

    #[test]
    fn diff_tree_detects_added_modified_deleted() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());
        std::fs::write(dir.path().join("keep.txt"), "v1").unwrap();
        std::fs::write(dir.path().join("drop.txt"), "gone").unwrap();
        let base = commit_all(dir.path(), "base");

        std::fs::write(dir.path().join("keep.txt"), "v2").unwrap();
        std::fs::remove_file(dir.path().join("drop.txt")).unwrap();
        std::fs::write(dir.path().join("new.txt"), "new").unwrap();
        let head = commit_all(dir.path(), "head");

        let repo = GitRepo::new(dir.path());
        let changes = repo.diff_tree(&base, &head).unwrap();
        assert_eq!(changes.added, vec!["new.txt".to_string()]);
        assert_eq!(changes.modified, vec!["keep.txt".to_string()]);
        assert_eq!(changes.deleted, vec!["drop.txt".to_string()]);
    }

    #[test]
    fn commits_in_range_is_chronological() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());
        std::fs::write(dir.path().join("a.txt"), "1").unwrap();
        let c1 = commit_all(dir.path(), "c1");
        std::fs::write(dir.path().join("a.txt"), "2").unwrap();
        let c2 = commit_all(dir.path(), "c2");
        std::fs::write(dir.path().join("a.txt"), "3").unwrap();
        let c3 = commit_all(dir.path(), "c3");

        let repo = GitRepo::new(dir.path());
        let commits = repo.commits_in_range(&c1, &c3).unwrap();
        assert_eq!(commits, vec![c2, c3]);
    }
}
