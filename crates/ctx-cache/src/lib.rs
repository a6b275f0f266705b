// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Content-hash-keyed artifact cache used by the optimizer and telemetry
//! components to avoid recomputing or re-requesting identical work.
//!
//! `Put` is single-process only: concurrent callers must serialize through
//! their own locking, same as every other JSONL-backed store in this
//! workspace.

use chrono::{DateTime, Utc};
use ctx_error::CtxError;
use ctx_store::Store;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One cached artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// This entry's derived cache key.
    pub key: String,
    /// Content hash of the artifact the payload was derived from.
    pub content_hash: String,
    /// What kind of artifact this is (e.g. `"context_pack"`, `"summary"`).
    pub artifact_type: String,
    /// The scope this entry is valid within (e.g. `"commit"`, `"task"`).
    pub scope_type: String,
    /// The scope's identifier (e.g. a commit SHA or task hash).
    pub scope_id: String,
    /// The model that produced the cached payload.
    pub model: String,
    /// Blob reference to the opaque payload bytes.
    pub payload_ref: String,
    /// Tokens consumed producing this entry.
    pub tokens_in: u32,
    /// Tokens in the cached payload itself.
    pub tokens_out: u32,
    /// When this entry was created.
    pub created_at: DateTime<Utc>,
}

/// Derive a cache key: `sha256(content_hash ':' artifact_type ':' scope_id)`
/// truncated to 128 bits, as 32 lowercase hex characters.
#[must_use]
pub fn cache_key(content_hash: &str, artifact_type: &str, scope_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content_hash.as_bytes());
    hasher.update(b":");
    hasher.update(artifact_type.as_bytes());
    hasher.update(b":");
    hasher.update(scope_id.as_bytes());
    let digest = hasher.finalize();
    let mut s = String::with_capacity(32);
    for b in &digest[..16] {
        s.push_str(&format!("{b:02x}"));
    }
    s
}

fn entries_path(store: &Store) -> std::path::PathBuf {
    store.cache_dir().join("entries.jsonl")
}

/// Insert or replace a cache entry by its key, keeping the file sorted by
/// key.
pub fn put(store: &Store, mut entry: CacheEntry) -> Result<(), CtxError> {
    entry.key = cache_key(&entry.content_hash, &entry.artifact_type, &entry.scope_id);
    let path = entries_path(store);
    let mut entries: Vec<CacheEntry> = ctx_jsonl::read_records(&path)?;
    match entries.iter().position(|e| e.key == entry.key) {
        Some(i) => entries[i] = entry,
        None => entries.push(entry),
    }
    entries.sort_by(|a, b| a.key.cmp(&b.key));
    ctx_jsonl::write_records(&path, &entries)
}

/// Return the first entry matching `content_hash` and `artifact_type`,
/// regardless of scope.
pub fn get(store: &Store, content_hash: &str, artifact_type: &str) -> Result<Option<CacheEntry>, CtxError> {
    let entries: Vec<CacheEntry> = ctx_jsonl::read_records(&entries_path(store))?;
    Ok(entries
        .into_iter()
        .find(|e| e.content_hash == content_hash && e.artifact_type == artifact_type))
}

/// Remove every entry whose `content_hash` matches, returning the count
/// removed.
pub fn invalidate(store: &Store, content_hash: &str) -> Result<usize, CtxError> {
    let path = entries_path(store);
    let entries: Vec<CacheEntry> = ctx_jsonl::read_records(&path)?;
    let (kept, removed): (Vec<_>, Vec<_>) =
        entries.into_iter().partition(|e| e.content_hash != content_hash);
    ctx_jsonl::write_records(&path, &kept)?;
    Ok(removed.len())
}

/// All cache entries, in on-disk (key-sorted) order.
pub fn list(store: &Store) -> Result<Vec<CacheEntry>, CtxError> {
    ctx_jsonl::read_records(&entries_path(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(content_hash: &str, scope_id: &str) -> CacheEntry {
        CacheEntry {
            key: String::new(),
            content_hash: content_hash.to_string(),
            artifact_type: "context_pack".to_string(),
            scope_type: "commit".to_string(),
            scope_id: scope_id.to_string(),
            model: "m".to_string(),
            payload_ref: "sha256:deadbeef".to_string(),
            tokens_in: 100,
            tokens_out: 50,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ctx_store::init(dir.path()).unwrap();
        put(&store, entry("hash-a", "c1")).unwrap();

        let found = get(&store, "hash-a", "context_pack").unwrap().unwrap();
        assert_eq!(found.scope_id, "c1");
    }

    #[test]
    fn put_replaces_by_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = ctx_store::init(dir.path()).unwrap();
        put(&store, entry("hash-a", "c1")).unwrap();
        let mut updated = entry("hash-a", "c1");
        updated.tokens_out = 999;
        put(&store, updated).unwrap();

        let all = list(&store).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].tokens_out, 999);
    }

    #[test]
    fn invalidate_removes_matching_content_hash() {
        let dir = tempfile::tempdir().unwrap();
        let store = ctx_store::init(dir.path()).unwrap();
        put(&store, entry("hash-a", "c1")).unwrap();
        put(&store, entry("hash-a", "c2")).unwrap();
        put(&store, entry("hash-b", "c1")).unwrap();

        let removed = invalidate(&store, "hash-a").unwrap();
        assert_eq!(removed, 2);
        assert_eq!(list(&store).unwrap().len(), 1);
    }

    #[test]
    fn get_misses_return_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = ctx_store::init(dir.path()).unwrap();
        assert!(get(&store, "nope", "context_pack").unwrap().is_none());
    }
}
