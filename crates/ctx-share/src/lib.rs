// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Forking, editing, and finalizing shareable context packs.
//!
//! A fork copies an existing pack's manifest into a mutable draft file
//! under `drafts/`. A draft can be edited freely on disk (by hand or by an
//! agent) until it is finalized: canonicalized, hashed, blobbed, and
//! registered as a new immutable pack.

use chrono::{DateTime, Utc};
use ctx_error::{CtxError, ErrorCode};
use ctx_manifest::PackManifest;
use ctx_store::Store;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Fork `source_ref` (any resolvable hash reference) into a new draft file
/// under `drafts/`, returning the path written.
///
/// The draft's `parent` is set to the source pack's hash and its own
/// `hash` is cleared; it is not yet a valid registered pack.
pub fn fork(store: &Store, source_ref: &str) -> Result<PathBuf, CtxError> {
    let source = ctx_manifest::load(store, source_ref)?;
    let mut draft = source;
    draft.parent = draft.hash.clone();
    draft.hash = String::new();

    let short_parent = ctx_hash::short(&draft.parent, 8);
    let path = store.drafts_dir().join(format!("{short_parent}.draft.json"));
    let json = serde_json::to_string_pretty(&draft).map_err(|e| encode_err(&e))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(&path, e))?;
    }
    std::fs::write(&path, json).map_err(|e| io_err(&path, e))?;

    Ok(path)
}

/// Finalize a draft at `path`: requires a non-empty `parent`, canonicalizes
/// and hashes the manifest, stores it as a blob, registers it, and removes
/// the draft file.
pub fn finalize_draft(store: &Store, path: &Path) -> Result<PackManifest, CtxError> {
    let bytes = std::fs::read(path).map_err(|e| io_err(path, e))?;
    let mut draft: PackManifest = serde_json::from_slice(&bytes).map_err(|e| {
        CtxError::new(ErrorCode::ManifestInvalid, "draft failed to decode")
            .with_context("path", path.display().to_string())
            .with_context("reason", e.to_string())
    })?;

    if draft.parent.trim().is_empty() {
        return Err(
            CtxError::new(ErrorCode::ShareFinalizeWithoutParent, "draft has no parent pack")
                .with_context("path", path.display().to_string()),
        );
    }

    draft.hash = String::new();
    let value = serde_json::to_value(&draft).map_err(|e| encode_err(&e))?;
    let canonical = ctx_manifest::canonical_string(&value);

    let blobs = store.blobs();
    let hash = blobs.write(canonical.as_bytes())?;
    draft.hash = hash.clone();
    for output in &mut draft.outputs {
        output.context_pack = hash.clone();
    }

    ctx_manifest::register(store, &hash)?;
    std::fs::remove_file(path).map_err(|e| io_err(path, e))?;

    Ok(draft)
}

/// Summary of a registered pack, as projected by [`list_packs`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackSummary {
    /// Full pack hash reference.
    pub hash: String,
    /// First 8 hex characters of the pack's hash.
    pub short_hash: String,
    /// When the pack was created.
    pub created: DateTime<Utc>,
    /// Identifier of the model that produced the pack.
    pub model: String,
    /// Number of steps recorded in the pack.
    pub step_count: usize,
    /// The pack's parent hash, empty if it has none.
    pub parent_hash: String,
}

/// List every registered pack, newest first, truncated to `limit` entries
/// (`None` returns every pack).
pub fn list_packs(store: &Store, limit: Option<usize>) -> Result<Vec<PackSummary>, CtxError> {
    let packs_dir = store.packs_dir();
    if !packs_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut summaries = Vec::new();
    let entries = std::fs::read_dir(&packs_dir).map_err(|e| io_err(&packs_dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(&packs_dir, e))?;
        let hex = entry.file_name().to_string_lossy().into_owned();
        let reference = format!("sha256:{hex}");
        let manifest = ctx_manifest::load(store, &reference)?;
        summaries.push(PackSummary {
            hash: manifest.hash.clone(),
            short_hash: ctx_hash::short(&manifest.hash, 8),
            created: manifest.created,
            model: manifest.model.identifier.clone(),
            step_count: manifest.steps.len(),
            parent_hash: manifest.parent,
        });
    }

    summaries.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| a.hash.cmp(&b.hash)));
    if let Some(limit) = limit {
        summaries.truncate(limit);
    }
    Ok(summaries)
}

fn io_err(path: &Path, e: std::io::Error) -> CtxError {
    CtxError::new(ErrorCode::Internal, "I/O error in pack sharing")
        .with_context("path", path.display().to_string())
        .with_context("error", e.to_string())
}

fn encode_err(e: &serde_json::Error) -> CtxError {
    CtxError::new(ErrorCode::Internal, "failed to encode draft manifest").with_context("error", e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctx_execlog::{Environment, ExecutionLog, Model, NamedOutput, Step};
    use std::collections::BTreeMap;

    fn sample_log(output_text: &str) -> ExecutionLog {
        ExecutionLog {
            model: Model { identifier: "gpt-5".to_string(), parameters: BTreeMap::new() },
            system_prompt: "be helpful".to_string(),
            prompts: vec![],
            inputs: vec![],
            steps: vec![Step {
                index: 0,
                kind: "tool_call".to_string(),
                tool: "read_file".to_string(),
                parameters: BTreeMap::new(),
                output: "contents".to_string(),
                deterministic: true,
                timestamp: Utc::now(),
            }],
            outputs: vec![NamedOutput { name: "result".to_string(), content: output_text.to_string() }],
            environment: Environment { os: "linux".to_string(), runtime: "rust-1.80".to_string(), tool_versions: BTreeMap::new() },
        }
    }

    #[test]
    fn fork_then_finalize_registers_a_child_pack_with_parent_set() {
        let dir = tempfile::tempdir().unwrap();
        let store = ctx_store::init(dir.path()).unwrap();
        let source = ctx_manifest::create(&store, &sample_log("original")).unwrap();
        ctx_manifest::register(&store, &source.hash).unwrap();

        let draft_path = fork(&store, &source.hash).unwrap();
        assert!(draft_path.exists());

        let finalized = finalize_draft(&store, &draft_path).unwrap();
        assert_eq!(finalized.parent, source.hash);
        assert!(!finalized.hash.is_empty());
        assert_ne!(finalized.hash, source.hash);
        assert!(!draft_path.exists());
    }

    #[test]
    fn finalize_without_parent_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = ctx_store::init(dir.path()).unwrap();
        let orphan = ctx_manifest::create(&store, &sample_log("orphan")).unwrap();
        let path = store.drafts_dir().join("orphan.draft.json");
        std::fs::write(&path, serde_json::to_string_pretty(&orphan).unwrap()).unwrap();

        let err = finalize_draft(&store, &path).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ShareFinalizeWithoutParent);
    }

    #[test]
    fn list_packs_sorts_newest_first_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let store = ctx_store::init(dir.path()).unwrap();

        let a = ctx_manifest::create(&store, &sample_log("a")).unwrap();
        ctx_manifest::register(&store, &a.hash).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = ctx_manifest::create(&store, &sample_log("b")).unwrap();
        ctx_manifest::register(&store, &b.hash).unwrap();

        let all = list_packs(&store, None).unwrap();
        assert_eq!(all.len(), 2);

        let limited = list_packs(&store, Some(1)).unwrap();
        assert_eq!(limited.len(), 1);
    }
}
