//! Graph record types persisted as JSONL.

use chrono::{DateTime, Utc};
use ctx_symbols::{CallEdge, ImportEdge, Language, Region, Symbol, SymbolKind, Visibility};
use serde::{Deserialize, Serialize};

/// A single indexed commit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommitRecord {
    /// Repository name or path, as supplied by the caller.
    pub repo: String,
    /// Full commit SHA.
    pub sha: String,
    /// First parent SHA, empty for a root commit.
    pub parent_sha: String,
    /// Author name.
    pub author: String,
    /// Author timestamp.
    pub authored_at: DateTime<Utc>,
    /// Commit subject line.
    pub subject: String,
}

/// A global, cross-commit record of one path's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathRecord {
    /// Derived path-id.
    pub path_id: String,
    /// The path string itself.
    pub path: String,
    /// The first commit this path was observed at.
    pub first_seen_commit: String,
    /// The most recent commit this path was observed at.
    pub last_seen_commit: String,
}

/// One file's state at one commit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileSnapshot {
    /// The commit this snapshot belongs to.
    pub commit_sha: String,
    /// The file's path-id.
    pub path_id: String,
    /// The file's path string, for convenience.
    pub path: String,
    /// Content hash (plain hex sha256, not a `sha256:` reference).
    pub content_sha256: String,
    /// Detected source language.
    pub language: Language,
    /// Size in bytes.
    pub byte_size: u64,
    /// Line count, 0 for binary files.
    pub line_count: u32,
    /// Binary detection: a null byte or invalid UTF-8 in the first 8 KiB.
    pub is_binary: bool,
    /// Matched a generated/vendored-file marker.
    pub is_generated: bool,
}

/// A commit-scoped symbol record (wraps [`ctx_symbols::Symbol`] with its
/// commit).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymbolRecord {
    /// The commit this symbol was observed at.
    pub commit_sha: String,
    /// The path-id of the defining file.
    pub path_id: String,
    /// Derived symbol identifier.
    pub symbol_id: String,
    /// Identifier of the definition region.
    pub region_id: String,
    /// What kind of definition this is.
    pub kind: SymbolKind,
    /// Bare name.
    pub name: String,
    /// Fully qualified name.
    pub fqn: String,
    /// Exported/public vs. unexported/private.
    pub visibility: Visibility,
    /// Detected language.
    pub language: Language,
    /// Best-effort signature text.
    pub signature: String,
    /// A one-line docstring preview, if found.
    pub docstring: Option<String>,
}

impl SymbolRecord {
    /// Attach a commit SHA to a bare [`Symbol`].
    #[must_use]
    pub fn from_symbol(commit_sha: &str, symbol: Symbol) -> Self {
        Self {
            commit_sha: commit_sha.to_string(),
            path_id: symbol.path_id,
            symbol_id: symbol.symbol_id,
            region_id: symbol.region_id,
            kind: symbol.kind,
            name: symbol.name,
            fqn: symbol.fqn,
            visibility: symbol.visibility,
            language: symbol.language,
            signature: symbol.signature,
            docstring: symbol.docstring,
        }
    }
}

/// A commit-scoped region record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegionRecord {
    /// The commit this region was observed at.
    pub commit_sha: String,
    /// Owning file's path-id.
    pub path_id: String,
    /// Derived region identifier.
    pub region_id: String,
    /// 1-based start line.
    pub start_line: u32,
    /// 0-based start column.
    pub start_col: u32,
    /// 1-based end line (inclusive).
    pub end_line: u32,
    /// 0-based end column.
    pub end_col: u32,
    /// What this region is for.
    pub purpose: String,
    /// Content hash of the region's source text.
    pub region_hash: String,
}

impl RegionRecord {
    /// Attach a commit SHA to a bare [`Region`].
    #[must_use]
    pub fn from_region(commit_sha: &str, region: Region) -> Self {
        Self {
            commit_sha: commit_sha.to_string(),
            path_id: region.path_id,
            region_id: region.region_id,
            start_line: region.start_line,
            start_col: region.start_col,
            end_line: region.end_line,
            end_col: region.end_col,
            purpose: region.purpose,
            region_hash: region.region_hash,
        }
    }
}

/// A commit-scoped import edge record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportEdgeRecord {
    /// The commit this edge was observed at.
    pub commit_sha: String,
    /// Inner edge data.
    #[serde(flatten)]
    pub edge: ImportEdge,
}

/// A commit-scoped call edge record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallEdgeRecord {
    /// The commit this edge was observed at.
    pub commit_sha: String,
    /// Inner edge data.
    #[serde(flatten)]
    pub edge: CallEdge,
}
