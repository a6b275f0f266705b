//! Commit indexing: walks a commit's tree, classifies each file, and
//! extracts its symbols, regions, and edges into per-commit JSONL streams.

use crate::path::path_id;
use crate::records::{
    CallEdgeRecord, CommitRecord, FileSnapshot, ImportEdgeRecord, PathRecord, RegionRecord,
    SymbolRecord,
};
use ctx_error::CtxError;
use ctx_git::GitRepo;
use ctx_store::Store;
use ctx_symbols::{build_symbol_index, detect_language, extract_calls, extract_file, Symbol};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;

const GENERATED_MARKERS: &[&str] = &[
    "generated", "vendor/", "node_modules/", ".min.js", ".min.css", "go.sum",
    "package-lock.json", "yarn.lock", "pnpm-lock.yaml",
];

const BINARY_SNIFF_WINDOW: usize = 8 * 1024;

fn is_generated(path: &str) -> bool {
    GENERATED_MARKERS.iter().any(|marker| path.contains(marker))
}

fn classify_binary(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(BINARY_SNIFF_WINDOW)];
    if window.contains(&0u8) {
        return true;
    }
    std::str::from_utf8(window).is_err()
}

fn content_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn snapshot_dir(store: &Store, sha: &str) -> PathBuf {
    store.graph_snapshots_dir().join(sha)
}

fn manifests_dir(store: &Store) -> PathBuf {
    store.graph_manifests_dir()
}

struct FileUnit {
    path_id: String,
    source: String,
}

/// Index a single commit: idempotent by the presence of the commit's
/// `done` sentinel file in its snapshot directory.
pub fn index_commit(store: &Store, git: &GitRepo, repo: &str, sha: &str) -> Result<(), CtxError> {
    let dir = snapshot_dir(store, sha);
    if dir.join("done").exists() {
        return Ok(());
    }
    std::fs::create_dir_all(&dir).map_err(io_err)?;

    let meta = git.commit_metadata(sha)?;
    ctx_jsonl::append_record(
        &manifests_dir(store).join("commits.jsonl"),
        &CommitRecord {
            repo: repo.to_string(),
            sha: meta.sha.clone(),
            parent_sha: meta.parent_sha,
            author: meta.author,
            authored_at: meta.authored_at,
            subject: meta.subject,
        },
    )?;

    let files = git.list_files_at_commit(sha)?;
    let known_paths: HashMap<String, String> =
        files.iter().map(|p| (p.clone(), path_id(p))).collect();

    let mut snapshots = Vec::new();
    let mut all_symbols: Vec<Symbol> = Vec::new();
    // path-id -> (extraction, source text), kept only for non-binary,
    // non-generated files so call extraction can re-slice region text.
    let mut extracted: Vec<(FileUnit, ctx_symbols::FileExtraction)> = Vec::new();

    for path in &files {
        let Ok(bytes) = git.read_file_at_commit(sha, path) else {
            tracing::warn!(path, sha, "skipping unreadable file");
            continue;
        };

        let pid = known_paths[path].clone();
        let language = detect_language(path);
        let binary = classify_binary(&bytes);
        let generated = is_generated(path);
        let text = if binary { None } else { std::str::from_utf8(&bytes).ok() };
        let line_count = text.map(|t| t.lines().count() as u32).unwrap_or(0);

        snapshots.push(FileSnapshot {
            commit_sha: sha.to_string(),
            path_id: pid.clone(),
            path: path.clone(),
            content_sha256: content_sha256(&bytes),
            language,
            byte_size: bytes.len() as u64,
            line_count,
            is_binary: binary,
            is_generated: generated,
        });

        if let Some(text) = text {
            if !generated {
                let known = known_paths.clone();
                let resolve = move |candidate: &str| known.get(candidate).cloned();
                let extraction = extract_file(&pid, path, text, &resolve);
                all_symbols.extend(extraction.symbols.iter().cloned());
                extracted.push((
                    FileUnit { path_id: pid, source: text.to_string() },
                    extraction,
                ));
            }
        }
    }

    snapshots.sort_by(|a, b| a.path_id.cmp(&b.path_id));
    ctx_jsonl::write_records(&dir.join("files.jsonl"), &snapshots)?;

    let symbol_index = build_symbol_index(&all_symbols);

    let mut symbol_records: Vec<SymbolRecord> = Vec::new();
    let mut region_records: Vec<RegionRecord> = Vec::new();
    let mut import_records: Vec<ImportEdgeRecord> = Vec::new();
    let mut call_records: Vec<CallEdgeRecord> = Vec::new();

    for (unit, extraction) in &extracted {
        for symbol in &extraction.symbols {
            symbol_records.push(SymbolRecord::from_symbol(sha, symbol.clone()));
        }
        for region in &extraction.regions {
            region_records.push(RegionRecord::from_region(sha, region.clone()));
        }
        for edge in &extraction.imports {
            import_records.push(ImportEdgeRecord {
                commit_sha: sha.to_string(),
                edge: edge.clone(),
            });
        }

        let lines: Vec<&str> = unit.source.lines().collect();
        for symbol in &extraction.symbols {
            let Some(region) = extraction.regions.iter().find(|r| r.region_id == symbol.region_id) else {
                continue;
            };
            let start = (region.start_line as usize).saturating_sub(1);
            let end = (region.end_line as usize)
                .saturating_sub(1)
                .min(lines.len().saturating_sub(1));
            if lines.is_empty() || start > end {
                continue;
            }
            let body = lines[start..=end].join("\n");
            for edge in extract_calls(symbol, &body, &symbol_index) {
                call_records.push(CallEdgeRecord { commit_sha: sha.to_string(), edge });
            }
        }
    }

    symbol_records.sort_by(|a, b| a.symbol_id.cmp(&b.symbol_id));
    region_records.sort_by(|a, b| a.region_id.cmp(&b.region_id));
    import_records.sort_by(|a, b| {
        (&a.edge.from_path_id, &a.edge.to_path_id, &a.edge.to_external_module).cmp(&(
            &b.edge.from_path_id,
            &b.edge.to_path_id,
            &b.edge.to_external_module,
        ))
    });
    call_records.sort_by(|a, b| {
        (&a.edge.from_symbol_id, &a.edge.to_symbol_id, &a.edge.to_external_ref).cmp(&(
            &b.edge.from_symbol_id,
            &b.edge.to_symbol_id,
            &b.edge.to_external_ref,
        ))
    });

    if !symbol_records.is_empty() {
        ctx_jsonl::write_records(&dir.join("symbols.jsonl"), &symbol_records)?;
    }
    if !region_records.is_empty() {
        ctx_jsonl::write_records(&dir.join("regions.jsonl"), &region_records)?;
    }
    if !import_records.is_empty() {
        ctx_jsonl::write_records(&dir.join("edges.imports.jsonl"), &import_records)?;
    }
    if !call_records.is_empty() {
        ctx_jsonl::write_records(&dir.join("edges.calls.jsonl"), &call_records)?;
    }

    update_global_paths(store, &known_paths, sha)?;

    std::fs::write(dir.join("done"), b"").map_err(io_err)?;
    tracing::info!(sha, files = files.len(), "indexed commit");
    Ok(())
}

fn update_global_paths(
    store: &Store,
    known_paths: &HashMap<String, String>,
    sha: &str,
) -> Result<(), CtxError> {
    let paths_file = manifests_dir(store).join("paths.jsonl");
    let existing: Vec<PathRecord> = ctx_jsonl::read_records(&paths_file)?;
    let mut by_id: HashMap<String, PathRecord> =
        existing.into_iter().map(|r| (r.path_id.clone(), r)).collect();

    for (path, pid) in known_paths {
        by_id
            .entry(pid.clone())
            .and_modify(|r| r.last_seen_commit = sha.to_string())
            .or_insert_with(|| PathRecord {
                path_id: pid.clone(),
                path: path.clone(),
                first_seen_commit: sha.to_string(),
                last_seen_commit: sha.to_string(),
            });
    }

    let mut all: Vec<PathRecord> = by_id.into_values().collect();
    all.sort_by(|a, b| a.path_id.cmp(&b.path_id));
    ctx_jsonl::write_records(&paths_file, &all)
}

/// Index every commit in `base..head`, chronologically.
pub fn index_range(
    store: &Store,
    git: &GitRepo,
    repo: &str,
    base: &str,
    head: &str,
) -> Result<Vec<String>, CtxError> {
    let commits = git.commits_in_range(base, head)?;
    for sha in &commits {
        index_commit(store, git, repo, sha)?;
    }
    Ok(commits)
}

fn io_err(e: std::io::Error) -> CtxError {
    CtxError::new(ctx_error::ErrorCode::Internal, "I/O error during indexing")
        .with_context("error", e.to_string())
}
