// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ctx_replay::ExecutorRegistry;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ctx", version, about = "Content-addressed store for AI-agent execution records")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging.
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize a `.ctx/` store in the current directory.
    Init,

    /// Turn an execution-log JSON file into a registered pack manifest.
    Pack {
        /// Path to the execution-log JSON file.
        file: PathBuf,
    },

    /// Index a commit (or commit range) into the context graph.
    Index {
        /// Repository identifier recorded alongside indexed commits.
        #[arg(long)]
        repo: String,

        /// Path to the git repository to index.
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Commit to index. Defaults to HEAD.
        #[arg(long)]
        commit: Option<String>,

        /// Base commit; when given with `--commit`, indexes every commit in (base, commit].
        #[arg(long)]
        base: Option<String>,
    },

    /// Show the file-level delta between two already-indexed commits.
    Delta {
        /// Base commit.
        base: String,
        /// Head commit.
        head: String,
    },

    /// Show drift between two pack manifests.
    Diff {
        /// Hash reference (or prefix) of the first pack.
        a: String,
        /// Hash reference (or prefix) of the second pack.
        b: String,
    },

    /// Replay a pack's recorded tool steps and report fidelity.
    Replay {
        /// Hash reference (or prefix) of the pack to replay.
        pack: String,
    },

    /// Generate a task-driven context pack plan under a token budget.
    Optimize {
        /// Path to the git repository.
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Natural-language task description.
        #[arg(long)]
        task: String,
        /// Commit to plan against. Defaults to HEAD.
        #[arg(long)]
        commit: Option<String>,
        /// Token budget. Defaults to the optimizer's built-in cap.
        #[arg(long)]
        token_cap: Option<u32>,
        /// Include test files/symbols in the plan.
        #[arg(long)]
        include_tests: bool,
    },

    /// Verify an external artifact against its `.ctx.json` sidecar.
    Verify {
        /// Path to the artifact file (its sidecar is `<path>.ctx.json`).
        artifact: PathBuf,
    },

    /// Print a JSON schema to stdout.
    Schema {
        /// Which schema to print.
        #[arg(value_enum)]
        kind: SchemaArg,
    },
}

#[derive(Debug, Clone, ValueEnum)]
enum SchemaArg {
    /// Execution-log schema.
    ExecLog,
    /// Store config schema.
    Config,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.debug { "ctx=debug" } else { "ctx=info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match cli.command {
        Commands::Init => cmd_init(),
        Commands::Pack { file } => cmd_pack(&file),
        Commands::Index { repo, root, commit, base } => cmd_index(&repo, &root, commit, base),
        Commands::Delta { base, head } => cmd_delta(&base, &head),
        Commands::Diff { a, b } => cmd_diff(&a, &b),
        Commands::Replay { pack } => cmd_replay(&pack),
        Commands::Optimize { root, task, commit, token_cap, include_tests } => {
            cmd_optimize(&root, task, commit, token_cap, include_tests)
        }
        Commands::Verify { artifact } => cmd_verify(&artifact),
        Commands::Schema { kind } => cmd_schema(kind),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn open_store() -> Result<ctx_store::Store> {
    ctx_store::discover(&std::env::current_dir()?).context("discover .ctx store")
}

fn cmd_init() -> Result<()> {
    let store = ctx_store::init(&std::env::current_dir()?).context("initialize store")?;
    println!("initialized store at {}", store.root().display());
    Ok(())
}

fn cmd_pack(file: &std::path::Path) -> Result<()> {
    let store = open_store()?;
    let bytes = std::fs::read(file).with_context(|| format!("read {}", file.display()))?;
    let log = ctx_execlog::ExecutionLog::from_json(&bytes).context("parse execution log")?;
    let manifest = ctx_manifest::create(&store, &log).context("build pack manifest")?;
    ctx_manifest::register(&store, &manifest.hash).context("register pack")?;
    println!("{}", manifest.hash);
    Ok(())
}

fn cmd_index(repo: &str, root: &std::path::Path, commit: Option<String>, base: Option<String>) -> Result<()> {
    let store = open_store()?;
    let git = ctx_git::GitRepo::new(root);

    match (base, commit) {
        (Some(base), Some(head)) => {
            let indexed = ctx_graph::index_range(&store, &git, repo, &base, &head).context("index range")?;
            for sha in indexed {
                println!("{sha}");
            }
        }
        (None, commit) => {
            let sha = match commit {
                Some(sha) => sha,
                None => git.head_sha().context("resolve HEAD")?,
            };
            ctx_graph::index_commit(&store, &git, repo, &sha).context("index commit")?;
            println!("{sha}");
        }
        (Some(_), None) => anyhow::bail!("--base requires --commit"),
    }
    Ok(())
}

fn cmd_delta(base: &str, head: &str) -> Result<()> {
    let store = open_store()?;
    let delta = ctx_graph::compute_delta(&store, base, head).context("compute delta")?;
    println!("{delta}");
    Ok(())
}

fn cmd_diff(a: &str, b: &str) -> Result<()> {
    let store = open_store()?;
    let manifest_a = ctx_manifest::load(&store, a).context("load first pack")?;
    let manifest_b = ctx_manifest::load(&store, b).context("load second pack")?;
    let report = ctx_drift::diff(&manifest_a, &manifest_b);
    println!("{report}");
    Ok(())
}

fn cmd_replay(pack: &str) -> Result<()> {
    let store = open_store()?;
    let registry = ExecutorRegistry::default();
    let report = ctx_replay::replay(&store, pack, &registry).context("replay pack")?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    match report.fidelity.exit_code() {
        0 => Ok(()),
        code => std::process::exit(code),
    }
}

fn cmd_optimize(
    root: &std::path::Path,
    task: String,
    commit: Option<String>,
    token_cap: Option<u32>,
    include_tests: bool,
) -> Result<()> {
    let store = open_store()?;
    let git = ctx_git::GitRepo::new(root);
    let req = ctx_optimizer::OptimizeRequest { commit, task, token_cap, include_tests };
    let plan = ctx_optimizer::generate_pack(&store, &git, req).context("generate context pack")?;
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

fn cmd_verify(artifact: &std::path::Path) -> Result<()> {
    let store = open_store()?;
    let report = ctx_verify::verify_artifact(&store, artifact).context("verify artifact")?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.passed {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_schema(kind: SchemaArg) -> Result<()> {
    use schemars::schema_for;
    let json = match kind {
        SchemaArg::ExecLog => serde_json::to_value(schema_for!(ctx_execlog::ExecutionLog))?,
        SchemaArg::Config => serde_json::to_value(schema_for!(ctx_config::StoreConfig))?,
    };
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_cmd::Command;
    use predicates::str::contains;

    #[test]
    fn init_then_pack_produces_a_hash() {
        let dir = tempfile::tempdir().unwrap();

        Command::cargo_bin("ctx")
            .unwrap()
            .current_dir(dir.path())
            .arg("init")
            .assert()
            .success();

        let log = serde_json::json!({
            "model": {"identifier": "gpt-5", "parameters": {}},
            "system_prompt": "be helpful",
            "prompts": [],
            "inputs": [],
            "steps": [],
            "outputs": [{"name": "result", "content": "done"}],
            "environment": {"os": "linux", "runtime": "rust-1.80", "tool_versions": {}}
        });
        let log_path = dir.path().join("log.json");
        std::fs::write(&log_path, serde_json::to_string(&log).unwrap()).unwrap();

        Command::cargo_bin("ctx")
            .unwrap()
            .current_dir(dir.path())
            .args(["pack", log_path.to_str().unwrap()])
            .assert()
            .success()
            .stdout(contains("sha256:"));
    }

    #[test]
    fn schema_prints_valid_json() {
        Command::cargo_bin("ctx")
            .unwrap()
            .args(["schema", "exec-log"])
            .assert()
            .success();
    }
}
