// SPDX-License-Identifier: MIT OR Apache-2.0
//! Property-style tests for the quantified invariants the store, graph,
//! drift, replay, and optimizer engines must hold.

use chrono::{TimeZone, Utc};
use ctx_execlog::{Environment, ExecutionLog, Model, NamedOutput, Step};
use ctx_git::GitRepo;
use ctx_graph::{CommitRecord, FileSnapshot};
use ctx_replay::{ExecutorRegistry, Fidelity};
use proptest::prelude::*;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::process::Command;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn init_repo(dir: &std::path::Path) {
    Command::new("git").args(["init", "-q"]).current_dir(dir).status().unwrap();
    Command::new("git").args(["config", "user.name", "t"]).current_dir(dir).status().unwrap();
    Command::new("git").args(["config", "user.email", "t@t"]).current_dir(dir).status().unwrap();
}

fn commit_all(dir: &std::path::Path, message: &str) -> String {
    Command::new("git").args(["add", "-A"]).current_dir(dir).status().unwrap();
    Command::new("git").args(["commit", "-qm", message]).current_dir(dir).status().unwrap();
    let out = Command::new("git").args(["rev-parse", "HEAD"]).current_dir(dir).output().unwrap();
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

fn fixed_log() -> ExecutionLog {
    ExecutionLog {
        model: Model { identifier: "gpt-4".to_string(), parameters: BTreeMap::new() },
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
            timestamp: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }],
        outputs: vec![NamedOutput { name: "result".to_string(), content: "answer".to_string() }],
        environment: Environment { os: "linux".to_string(), runtime: "rust".to_string(), tool_versions: BTreeMap::new() },
    }
}

// ---------------------------------------------------------------------------
// 1. Hash stability / 2. Integrity
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn hash_is_stable_and_writing_twice_is_one_blob(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        let dir = tempfile::tempdir().unwrap();
        let blobs = ctx_store::BlobStore::new(dir.path());

        let first = blobs.write(&bytes).unwrap();
        let second = blobs.write(&bytes).unwrap();
        prop_assert_eq!(&first, &second);

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let expected = format!("sha256:{:x}", hasher.finalize());
        prop_assert_eq!(&first, &expected);

        let stored = blobs.read(&first).unwrap();
        let mut rehasher = Sha256::new();
        rehasher.update(&stored);
        prop_assert_eq!(format!("sha256:{:x}", rehasher.finalize()), first);
    }
}

// ---------------------------------------------------------------------------
// 3. Canonical equality / 4. Manifest self-consistency
// ---------------------------------------------------------------------------

#[test]
fn identical_logs_canonicalize_to_the_same_hash() {
    let dir = tempfile::tempdir().unwrap();
    let store = ctx_store::init(dir.path()).unwrap();

    let a = ctx_manifest::create(&store, &fixed_log()).unwrap();
    let dir2 = tempfile::tempdir().unwrap();
    let store2 = ctx_store::init(dir2.path()).unwrap();
    let b = ctx_manifest::create(&store2, &fixed_log()).unwrap();

    assert_eq!(a.hash, b.hash);
}

#[test]
fn loading_a_pack_by_its_own_hash_reproduces_it() {
    let dir = tempfile::tempdir().unwrap();
    let store = ctx_store::init(dir.path()).unwrap();
    let manifest = ctx_manifest::create(&store, &fixed_log()).unwrap();
    ctx_manifest::register(&store, &manifest.hash).unwrap();

    let loaded = ctx_manifest::load(&store, &manifest.hash).unwrap();
    assert_eq!(loaded, manifest);
}

// ---------------------------------------------------------------------------
// 5. Idempotent indexing / 6. Deterministic file-snapshot order
// ---------------------------------------------------------------------------

#[test]
fn reindexing_a_commit_is_a_no_op_and_files_stay_sorted_by_path_id() {
    let repo_dir = tempfile::tempdir().unwrap();
    init_repo(repo_dir.path());
    std::fs::write(repo_dir.path().join("z.go"), "package main\n").unwrap();
    std::fs::write(repo_dir.path().join("a.go"), "package main\n").unwrap();
    std::fs::write(repo_dir.path().join("m.go"), "package main\n").unwrap();
    let sha = commit_all(repo_dir.path(), "c1");

    let store_dir = tempfile::tempdir().unwrap();
    let store = ctx_store::init(store_dir.path()).unwrap();
    let git = GitRepo::new(repo_dir.path());

    ctx_graph::index_commit(&store, &git, "demo", &sha).unwrap();
    let snapshot_dir = store.graph_snapshots_dir().join(&sha);
    let files_jsonl = snapshot_dir.join("files.jsonl");
    let first_bytes = std::fs::read(&files_jsonl).unwrap();

    ctx_graph::index_commit(&store, &git, "demo", &sha).unwrap();
    let second_bytes = std::fs::read(&files_jsonl).unwrap();
    assert_eq!(first_bytes, second_bytes);

    let commits: Vec<CommitRecord> =
        ctx_jsonl::read_records(&store.graph_manifests_dir().join("commits.jsonl")).unwrap();
    assert_eq!(commits.len(), 1);

    let snapshots: Vec<FileSnapshot> = ctx_jsonl::read_records(&files_jsonl).unwrap();
    let ids: Vec<&str> = snapshots.iter().map(|s| s.path_id.as_str()).collect();
    let mut sorted_ids = ids.clone();
    sorted_ids.sort();
    assert_eq!(ids, sorted_ids);
}

// ---------------------------------------------------------------------------
// 7. Delta correctness (self-delta is empty)
// ---------------------------------------------------------------------------

#[test]
fn delta_of_a_commit_against_itself_is_empty() {
    let repo_dir = tempfile::tempdir().unwrap();
    init_repo(repo_dir.path());
    std::fs::write(repo_dir.path().join("a.go"), "package main\n").unwrap();
    let sha = commit_all(repo_dir.path(), "c1");

    let store_dir = tempfile::tempdir().unwrap();
    let store = ctx_store::init(store_dir.path()).unwrap();
    let git = GitRepo::new(repo_dir.path());
    ctx_graph::index_commit(&store, &git, "demo", &sha).unwrap();

    let delta = ctx_graph::compute_delta(&store, &sha, &sha).unwrap();
    assert!(delta.is_empty());
}

// ---------------------------------------------------------------------------
// 8. Drift zero
// ---------------------------------------------------------------------------

#[test]
fn diffing_a_pack_against_itself_has_zero_drift() {
    let dir = tempfile::tempdir().unwrap();
    let store = ctx_store::init(dir.path()).unwrap();
    let manifest = ctx_manifest::create(&store, &fixed_log()).unwrap();
    let report = ctx_drift::diff(&manifest, &manifest);
    assert!(!report.has_drift());
}

// ---------------------------------------------------------------------------
// 9. Fidelity monotonicity
// ---------------------------------------------------------------------------

#[test]
fn a_nondeterministic_divergence_alone_stays_exact() {
    let dir = tempfile::tempdir().unwrap();
    let store = ctx_store::init(dir.path()).unwrap();

    let mut log = fixed_log();
    log.steps[0].deterministic = false;
    log.steps[0].parameters.insert("path".to_string(), serde_json::Value::String("/dev/null".to_string()));
    log.steps[0].output = "anything not matching empty file".to_string();

    let manifest = ctx_manifest::create(&store, &log).unwrap();
    ctx_manifest::register(&store, &manifest.hash).unwrap();

    let report = ctx_replay::replay(&store, &manifest.hash, &ExecutorRegistry::default()).unwrap();
    assert_eq!(report.fidelity, Fidelity::Exact);
}

#[test]
fn one_deterministic_divergence_degrades_and_one_failure_fails() {
    let dir = tempfile::tempdir().unwrap();
    let store = ctx_store::init(dir.path()).unwrap();

    let mut degraded_log = fixed_log();
    degraded_log.steps[0].parameters.insert("path".to_string(), serde_json::Value::String("/dev/null".to_string()));
    degraded_log.steps[0].output = "not empty".to_string();
    let degraded_manifest = ctx_manifest::create(&store, &degraded_log).unwrap();
    ctx_manifest::register(&store, &degraded_manifest.hash).unwrap();
    let degraded = ctx_replay::replay(&store, &degraded_manifest.hash, &ExecutorRegistry::default()).unwrap();
    assert_eq!(degraded.fidelity, Fidelity::Degraded);

    let mut failed_log = fixed_log();
    failed_log.steps[0].tool = "no_such_tool".to_string();
    let failed_manifest = ctx_manifest::create(&store, &failed_log).unwrap();
    ctx_manifest::register(&store, &failed_manifest.hash).unwrap();
    let failed = ctx_replay::replay(&store, &failed_manifest.hash, &ExecutorRegistry::default()).unwrap();
    assert_eq!(failed.fidelity, Fidelity::Failed);
}

// ---------------------------------------------------------------------------
// 10. Prefix resolution
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn unique_prefixes_of_four_or_more_hex_chars_resolve(n in 4usize..16) {
        let dir = tempfile::tempdir().unwrap();
        let store = ctx_store::init(dir.path()).unwrap();
        let packs_dir = store.packs_dir();
        std::fs::create_dir_all(&packs_dir).unwrap();

        let full = ctx_hash::hash_content(b"a single registered pack");
        let (_, hex) = ctx_hash::parse(&full).unwrap();
        std::fs::write(packs_dir.join(hex), &full).unwrap();

        let prefix = &hex[..n];
        let resolved = ctx_hash::resolve(&packs_dir, prefix).unwrap();
        prop_assert_eq!(resolved, full);
    }
}

// ---------------------------------------------------------------------------
// 11. Optimizer budget respect
// ---------------------------------------------------------------------------

#[test]
fn small_uniform_files_never_exceed_the_cap() {
    let repo_dir = tempfile::tempdir().unwrap();
    init_repo(repo_dir.path());
    for name in ["one.go", "two.go", "three.go"] {
        std::fs::write(repo_dir.path().join(name), "package main\nfunc A(){}\n").unwrap();
    }
    let sha = commit_all(repo_dir.path(), "c1");

    let store_dir = tempfile::tempdir().unwrap();
    let store = ctx_store::init(store_dir.path()).unwrap();
    let git = GitRepo::new(repo_dir.path());
    ctx_graph::index_commit(&store, &git, "demo", &sha).unwrap();

    let token_cap = 40;
    let req = ctx_optimizer::OptimizeRequest {
        commit: Some(sha),
        task: "banana fruit".to_string(),
        token_cap: Some(token_cap),
        include_tests: false,
    };
    let plan = ctx_optimizer::generate_pack(&store, &git, req).unwrap();

    assert!(plan.files.iter().all(|f| f.estimated_tokens <= token_cap / 4));
    assert!(plan.estimated_tokens <= token_cap);
}

#[test]
fn an_oversized_high_relevance_file_never_exceeds_double_the_cap() {
    let repo_dir = tempfile::tempdir().unwrap();
    init_repo(repo_dir.path());
    let padding = "x".repeat(200);
    std::fs::write(
        repo_dir.path().join("auth.go"),
        format!("package main\n// {padding}\nfunc Auth() {{}}\n"),
    )
    .unwrap();
    let sha = commit_all(repo_dir.path(), "c1");

    let store_dir = tempfile::tempdir().unwrap();
    let store = ctx_store::init(store_dir.path()).unwrap();
    let git = GitRepo::new(repo_dir.path());
    ctx_graph::index_commit(&store, &git, "demo", &sha).unwrap();

    let token_cap = 40;
    let req = ctx_optimizer::OptimizeRequest {
        commit: Some(sha),
        task: "auth".to_string(),
        token_cap: Some(token_cap),
        include_tests: false,
    };
    let plan = ctx_optimizer::generate_pack(&store, &git, req).unwrap();

    assert!(!plan.files.is_empty(), "the oversized high-relevance file must still be admitted");
    assert!(plan.estimated_tokens <= 2 * token_cap);
}
