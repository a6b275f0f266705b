// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Task-driven selection of files and symbols from an indexed commit,
//! greedily packed under a token budget.

mod scoring;
mod tokenize;

pub use tokenize::tokenize;

use ctx_error::{CtxError, ErrorCode};
use ctx_git::GitRepo;
use ctx_graph::{FileSnapshot, SymbolRecord};
use ctx_store::Store;
use ctx_symbols::Language;
use serde::{Deserialize, Serialize};

/// Default token budget when a request does not specify one.
pub const DEFAULT_TOKEN_CAP: u32 = 32_000;

/// A request to build a context pack for a task at a commit.
#[derive(Debug, Clone)]
pub struct OptimizeRequest {
    /// Commit to index against; `None` resolves to the repository's HEAD.
    pub commit: Option<String>,
    /// Natural-language task description. Must be non-empty.
    pub task: String,
    /// Token budget; `None` uses [`DEFAULT_TOKEN_CAP`].
    pub token_cap: Option<u32>,
    /// Whether test files/symbols are eligible for selection.
    pub include_tests: bool,
}

/// One selected file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileSelection {
    /// The file's path.
    pub path: String,
    /// Detected language.
    pub language: Language,
    /// Estimated token cost.
    pub estimated_tokens: u32,
    /// Computed relevance score.
    pub score: f64,
    /// Relevance tier: `"high-relevance"`, `"medium-relevance"`, or `"low-relevance"`.
    pub reason: String,
}

/// One selected symbol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymbolSelection {
    /// Fully qualified name.
    pub fqn: String,
    /// Owning file's path.
    pub path: String,
    /// Estimated token cost.
    pub estimated_tokens: u32,
    /// Computed relevance score.
    pub score: f64,
    /// `task-relevant-<kind>` label.
    pub reason: String,
}

/// The generated context pack plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContextPackPlan {
    /// The commit this plan was built against.
    pub commit: String,
    /// The task the plan serves.
    pub task: String,
    /// The token budget honored.
    pub token_cap: u32,
    /// Selected files.
    pub files: Vec<FileSelection>,
    /// Selected symbols.
    pub symbols: Vec<SymbolSelection>,
    /// Sum of estimated tokens across files and symbols.
    pub estimated_tokens: u32,
}

fn relevance_label(score: f64) -> &'static str {
    if score >= 2.0 {
        "high-relevance"
    } else if score >= 0.5 {
        "medium-relevance"
    } else {
        "low-relevance"
    }
}

/// Build a context pack for `req` against the commit's indexed graph.
pub fn generate_pack(store: &Store, git: &GitRepo, req: OptimizeRequest) -> Result<ContextPackPlan, CtxError> {
    if req.task.trim().is_empty() {
        return Err(CtxError::new(ErrorCode::OptimizerInvalidRequest, "task must be non-empty"));
    }

    let commit = match req.commit {
        Some(sha) => sha,
        None => git.head_sha()?,
    };
    let token_cap = req.token_cap.unwrap_or(DEFAULT_TOKEN_CAP);
    let task_words = tokenize::tokenize(&req.task);

    let snapshot_dir = store.graph_snapshots_dir().join(&commit);
    let snapshots: Vec<FileSnapshot> = ctx_jsonl::read_records(&snapshot_dir.join("files.jsonl"))?;
    let symbols: Vec<SymbolRecord> = ctx_jsonl::read_records(&snapshot_dir.join("symbols.jsonl"))?;

    let mut candidates: Vec<(FileSnapshot, f64)> = snapshots
        .into_iter()
        .filter(|s| !s.is_binary && !s.is_generated)
        .filter(|s| req.include_tests || !scoring::is_test_path(&s.path))
        .map(|s| {
            let score = scoring::score_file(&s.path, s.language, &task_words);
            (s, score)
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.path.cmp(&b.0.path))
    });

    let mut files = Vec::new();
    let mut admitted_paths: std::collections::HashMap<String, String> = std::collections::HashMap::new();
    let mut used_tokens: u32 = 0;

    for (snapshot, score) in candidates {
        let tokens = scoring::tokens_for_bytes(snapshot.byte_size);
        let fits = used_tokens.saturating_add(tokens) <= token_cap;
        let over_budget_allowed = score >= 2.0 && (token_cap.saturating_sub(used_tokens)) >= token_cap / 4;

        if !fits && !over_budget_allowed {
            continue;
        }

        used_tokens = used_tokens.saturating_add(tokens);
        admitted_paths.insert(snapshot.path_id.clone(), snapshot.path.clone());
        files.push(FileSelection {
            path: snapshot.path,
            language: snapshot.language,
            estimated_tokens: tokens,
            score,
            reason: relevance_label(score).to_string(),
        });
    }

    let mut symbol_candidates: Vec<(SymbolRecord, f64)> = symbols
        .into_iter()
        .filter(|s| admitted_paths.contains_key(&s.path_id))
        .map(|s| {
            let score = scoring::score_symbol(s.kind, s.visibility, &s.name, &s.fqn, &task_words);
            (s, score)
        })
        .collect();
    symbol_candidates.sort_by(|a, b| {
        b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.fqn.cmp(&b.0.fqn))
    });

    let mut symbol_selections = Vec::new();
    for (symbol, score) in symbol_candidates {
        let tokens = scoring::tokens_for_symbol_text(&symbol.signature, symbol.docstring.as_deref());
        if used_tokens.saturating_add(tokens) > token_cap {
            continue;
        }
        used_tokens = used_tokens.saturating_add(tokens);
        let path = admitted_paths.get(&symbol.path_id).cloned().unwrap_or_else(|| symbol.path_id.clone());
        symbol_selections.push(SymbolSelection {
            fqn: symbol.fqn,
            path,
            estimated_tokens: tokens,
            score,
            reason: format!("task-relevant-{}", scoring::symbol_kind_label(symbol.kind)),
        });
    }

    Ok(ContextPackPlan {
        commit,
        task: req.task,
        token_cap,
        files,
        symbols: symbol_selections,
        estimated_tokens: used_tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

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

    #[test]
    fn rejects_empty_task() {
        let repo_dir = tempfile::tempdir().unwrap();
        init_repo(repo_dir.path());
        std::fs::write(repo_dir.path().join("a.go"), "package main\n").unwrap();
        commit_all(repo_dir.path(), "c1");

        let store_dir = tempfile::tempdir().unwrap();
        let store = ctx_store::init(store_dir.path()).unwrap();
        let git = GitRepo::new(repo_dir.path());

        let req = OptimizeRequest { commit: None, task: "   ".to_string(), token_cap: None, include_tests: false };
        assert!(generate_pack(&store, &git, req).is_err());
    }

    #[test]
    fn selects_task_relevant_file_and_symbol() {
        let repo_dir = tempfile::tempdir().unwrap();
        init_repo(repo_dir.path());
        std::fs::write(
            repo_dir.path().join("auth.go"),
            "package main\n\nfunc ValidateAuth(token string) bool {\n\treturn len(token) > 0\n}\n",
        )
        .unwrap();
        std::fs::write(repo_dir.path().join("unrelated.go"), "package main\n\nfunc Noop() {}\n").unwrap();
        let sha = commit_all(repo_dir.path(), "c1");

        let store_dir = tempfile::tempdir().unwrap();
        let store = ctx_store::init(store_dir.path()).unwrap();
        let git = GitRepo::new(repo_dir.path());
        ctx_graph::index_commit(&store, &git, "demo", &sha).unwrap();

        let req = OptimizeRequest {
            commit: Some(sha.clone()),
            task: "fix the auth validation".to_string(),
            token_cap: None,
            include_tests: false,
        };
        let plan = generate_pack(&store, &git, req).unwrap();
        assert!(plan.files.iter().any(|f| f.path == "auth.go"));
        assert!(plan.symbols.iter().any(|s| s.fqn.contains("ValidateAuth")));
    }
}
