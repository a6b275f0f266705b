//! Delta engine: set differences between two commits' file snapshots.

use crate::records::FileSnapshot;
use ctx_error::CtxError;
use ctx_store::Store;
use std::collections::HashMap;
use std::fmt;

/// One path's delta classification.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DeltaEntry {
    /// The affected path, or its path-id if the path string could not be
    /// resolved from the global path map.
    pub path: String,
}

/// The result of [`compute_delta`]: three path-id set differences between
/// `base` and `head`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    /// Base commit (full SHA).
    pub base: String,
    /// Head commit (full SHA).
    pub head: String,
    /// Paths present at head but not base.
    pub added: Vec<DeltaEntry>,
    /// Paths present in both with a differing content hash.
    pub changed: Vec<DeltaEntry>,
    /// Paths present at base but not head.
    pub deleted: Vec<DeltaEntry>,
}

impl Delta {
    /// Whether all three sections are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.deleted.is_empty()
    }
}

fn short(sha: &str) -> &str {
    &sha[..sha.len().min(8)]
}

impl fmt::Display for Delta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "delta {}..{} (+{} ~{} -{})",
            short(&self.base),
            short(&self.head),
            self.added.len(),
            self.changed.len(),
            self.deleted.len()
        )?;
        for e in &self.added {
            writeln!(f, "+ {}", e.path)?;
        }
        for e in &self.changed {
            writeln!(f, "~ {}", e.path)?;
        }
        for e in &self.deleted {
            writeln!(f, "- {}", e.path)?;
        }
        Ok(())
    }
}

fn load_snapshots(store: &Store, sha: &str) -> Result<HashMap<String, FileSnapshot>, CtxError> {
    let file = store.graph_snapshots_dir().join(sha).join("files.jsonl");
    let records: Vec<FileSnapshot> = ctx_jsonl::read_records(&file)?;
    Ok(records.into_iter().map(|r| (r.path_id.clone(), r)).collect())
}

fn resolve_path(path_map: &HashMap<String, String>, path_id: &str) -> String {
    path_map.get(path_id).cloned().unwrap_or_else(|| path_id.to_string())
}

/// Compare two commits' file-snapshot streams by path-id.
pub fn compute_delta(store: &Store, base: &str, head: &str) -> Result<Delta, CtxError> {
    let base_snaps = load_snapshots(store, base)?;
    let head_snaps = load_snapshots(store, head)?;

    let global_paths: Vec<crate::records::PathRecord> =
        ctx_jsonl::read_records(&store.graph_manifests_dir().join("paths.jsonl"))?;
    let path_map: HashMap<String, String> =
        global_paths.into_iter().map(|r| (r.path_id, r.path)).collect();

    let mut added = Vec::new();
    let mut changed = Vec::new();
    let mut deleted = Vec::new();

    for (pid, head_snap) in &head_snaps {
        match base_snaps.get(pid) {
            None => added.push(DeltaEntry { path: resolve_path(&path_map, pid) }),
            Some(base_snap) => {
                if base_snap.content_sha256 != head_snap.content_sha256 {
                    changed.push(DeltaEntry { path: resolve_path(&path_map, pid) });
                }
            }
        }
    }
    for pid in base_snaps.keys() {
        if !head_snaps.contains_key(pid) {
            deleted.push(DeltaEntry { path: resolve_path(&path_map, pid) });
        }
    }

    added.sort();
    changed.sort();
    deleted.sort();

    Ok(Delta { base: base.to_string(), head: head.to_string(), added, changed, deleted })
}
