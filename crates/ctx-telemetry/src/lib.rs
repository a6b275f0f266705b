// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Per-run token-savings telemetry and ROI aggregation.
//!
//! Runs are append-only records in `telemetry/runs.jsonl`: a completed
//! optimizer invocation's baseline/delta token counts, cache hit rate, and
//! invalidation counts, keyed by a run-id derived from its identifying
//! fields.

use chrono::{DateTime, Utc};
use ctx_error::CtxError;
use ctx_graph::FileSnapshot;
use ctx_store::Store;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Outcome of a recorded run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The run completed and its pack was generated/replayed successfully.
    Success,
    /// The run completed but degraded (e.g. drift detected, cache miss storm).
    Degraded,
    /// The run failed before producing a usable result.
    Failed,
}

/// Token-savings and cache metrics captured for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunMetrics {
    /// Estimated tokens for a full, unoptimized context at this commit.
    pub baseline_tokens: u32,
    /// Estimated tokens actually included in the generated pack.
    pub delta_tokens: u32,
    /// `max(baseline - delta, 0)`.
    pub tokens_saved: u32,
    /// `tokens_saved / baseline * 100`, `0.0` if baseline is zero.
    pub savings_percent: f64,
    /// Fraction of cache lookups that hit, `0.0` to `1.0`.
    pub cache_hit_rate: f64,
    /// Number of files invalidated since the prior run.
    pub files_invalidated: u32,
    /// Number of symbols invalidated since the prior run.
    pub symbols_invalidated: u32,
    /// Wall-clock latency of the run in milliseconds.
    pub latency_ms: u64,
}

/// One recorded optimizer/replay run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelemetryRun {
    /// Stable identifier for this run; assigned by [`record_run`] if empty.
    pub run_id: String,
    /// Repository identifier the run was performed against.
    pub repo: String,
    /// Base commit (for delta-style runs); equal to `head` for a single-commit run.
    pub base_commit: String,
    /// Head commit the run targeted.
    pub head_commit: String,
    /// Identifier of the agent that initiated the run.
    pub agent: String,
    /// Hash of the task description, for grouping repeat runs on the same task.
    pub task_hash: String,
    /// The run's outcome.
    pub status: RunStatus,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run ended.
    pub ended_at: DateTime<Utc>,
    /// The run's metrics.
    pub metrics: RunMetrics,
}

fn runs_path(store: &Store) -> PathBuf {
    store.telemetry_dir().join("runs.jsonl")
}

fn derive_run_id(repo: &str, head_commit: &str, task_hash: &str, started_at: &DateTime<Utc>) -> String {
    let input = format!("{repo}:{head_commit}:{task_hash}:{}", started_at.timestamp_nanos_opt().unwrap_or(0));
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut s = String::with_capacity(16);
    for b in &digest[..8] {
        s.push_str(&format!("{b:02x}"));
    }
    s
}

/// Record a completed run, assigning a run-id and computing derived
/// savings fields if absent, then appending it to `telemetry/runs.jsonl`.
pub fn record_run(store: &Store, mut run: TelemetryRun, mut metrics: RunMetrics) -> Result<TelemetryRun, CtxError> {
    if run.run_id.is_empty() {
        run.run_id = derive_run_id(&run.repo, &run.head_commit, &run.task_hash, &run.started_at);
    }

    if metrics.baseline_tokens > 0 && metrics.delta_tokens > 0 {
        let saved = metrics.baseline_tokens.saturating_sub(metrics.delta_tokens);
        metrics.tokens_saved = saved;
        metrics.savings_percent = (saved as f64 / metrics.baseline_tokens as f64) * 100.0;
    }

    run.metrics = metrics;
    ctx_jsonl::append_record(&runs_path(store), &run)?;
    Ok(run)
}

/// Read all recorded runs, sorted descending by `ended_at`, truncated to
/// `limit` entries (`None` returns every run).
pub fn get_runs(store: &Store, limit: Option<usize>) -> Result<Vec<TelemetryRun>, CtxError> {
    let mut runs: Vec<TelemetryRun> = ctx_jsonl::read_records(&runs_path(store))?;
    runs.sort_by(|a, b| b.ended_at.cmp(&a.ended_at));
    if let Some(limit) = limit {
        runs.truncate(limit);
    }
    Ok(runs)
}

/// Read all recorded runs' metrics, sorted descending by `ended_at`,
/// truncated to `limit` entries.
pub fn get_metrics(store: &Store, limit: Option<usize>) -> Result<Vec<RunMetrics>, CtxError> {
    Ok(get_runs(store, limit)?.into_iter().map(|r| r.metrics).collect())
}

/// Aggregated return-on-investment summary across every recorded run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RoiSummary {
    /// Number of runs the summary was computed over.
    pub run_count: usize,
    /// Sum of baseline tokens across all runs.
    pub total_baseline_tokens: u64,
    /// Sum of delta tokens across all runs.
    pub total_delta_tokens: u64,
    /// Sum of tokens saved across all runs.
    pub total_tokens_saved: u64,
    /// Mean savings percent across all runs.
    pub mean_savings_percent: f64,
    /// Best (highest) single-run savings percent.
    pub best_savings_percent: f64,
    /// Worst (lowest) single-run savings percent.
    pub worst_savings_percent: f64,
    /// Mean cache hit rate across all runs.
    pub mean_cache_hit_rate: f64,
}

/// Compute an [`RoiSummary`] across every run currently recorded.
pub fn compute_roi(store: &Store) -> Result<RoiSummary, CtxError> {
    let runs = get_runs(store, None)?;
    if runs.is_empty() {
        return Ok(RoiSummary::default());
    }

    let run_count = runs.len();
    let total_baseline_tokens: u64 = runs.iter().map(|r| u64::from(r.metrics.baseline_tokens)).sum();
    let total_delta_tokens: u64 = runs.iter().map(|r| u64::from(r.metrics.delta_tokens)).sum();
    let total_tokens_saved: u64 = runs.iter().map(|r| u64::from(r.metrics.tokens_saved)).sum();

    let savings: Vec<f64> = runs.iter().map(|r| r.metrics.savings_percent).collect();
    let mean_savings_percent = savings.iter().sum::<f64>() / run_count as f64;
    let best_savings_percent = savings.iter().cloned().fold(f64::MIN, f64::max);
    let worst_savings_percent = savings.iter().cloned().fold(f64::MAX, f64::min);

    let mean_cache_hit_rate = runs.iter().map(|r| r.metrics.cache_hit_rate).sum::<f64>() / run_count as f64;

    Ok(RoiSummary {
        run_count,
        total_baseline_tokens,
        total_delta_tokens,
        total_tokens_saved,
        mean_savings_percent,
        best_savings_percent,
        worst_savings_percent,
        mean_cache_hit_rate,
    })
}

fn tokens_for_bytes(byte_size: u64) -> u32 {
    ((byte_size as f64) * 0.25).floor().max(1.0) as u32
}

/// Estimate the token cost of a full, unoptimized context at `commit`: the
/// sum of `byte_size * 0.25` over every non-binary, non-generated file
/// snapshot indexed for that commit.
pub fn estimate_baseline(store: &Store, commit: &str) -> Result<u32, CtxError> {
    let snapshot_path = store.graph_snapshots_dir().join(commit).join("files.jsonl");
    let snapshots: Vec<FileSnapshot> = ctx_jsonl::read_records(&snapshot_path)?;
    let total: u64 = snapshots
        .iter()
        .filter(|s| !s.is_binary && !s.is_generated)
        .map(|s| u64::from(tokens_for_bytes(s.byte_size)))
        .sum();
    Ok(total.min(u64::from(u32::MAX)) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_run(started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> TelemetryRun {
        TelemetryRun {
            run_id: String::new(),
            repo: "demo".to_string(),
            base_commit: "aaa".to_string(),
            head_commit: "bbb".to_string(),
            agent: "agent-1".to_string(),
            task_hash: "task-hash-1".to_string(),
            status: RunStatus::Success,
            started_at,
            ended_at,
            metrics: RunMetrics::default(),
        }
    }

    #[test]
    fn record_run_assigns_run_id_and_computes_savings() {
        let dir = tempfile::tempdir().unwrap();
        let store = ctx_store::init(dir.path()).unwrap();
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let run = sample_run(t0, t0);
        let metrics = RunMetrics { baseline_tokens: 1000, delta_tokens: 400, ..Default::default() };

        let recorded = record_run(&store, run, metrics).unwrap();
        assert!(!recorded.run_id.is_empty());
        assert_eq!(recorded.metrics.tokens_saved, 600);
        assert!((recorded.metrics.savings_percent - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn record_run_is_deterministic_for_same_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let store = ctx_store::init(dir.path()).unwrap();
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

        let r1 = record_run(&store, sample_run(t0, t0), RunMetrics::default()).unwrap();
        let dir2 = tempfile::tempdir().unwrap();
        let store2 = ctx_store::init(dir2.path()).unwrap();
        let r2 = record_run(&store2, sample_run(t0, t0), RunMetrics::default()).unwrap();
        assert_eq!(r1.run_id, r2.run_id);
    }

    #[test]
    fn get_runs_sorts_descending_by_end_time_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let store = ctx_store::init(dir.path()).unwrap();
        let t1 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
        let t3 = Utc.with_ymd_and_hms(2026, 1, 3, 0, 0, 0).unwrap();

        record_run(&store, sample_run(t1, t1), RunMetrics::default()).unwrap();
        record_run(&store, sample_run(t2, t2), RunMetrics::default()).unwrap();
        record_run(&store, sample_run(t3, t3), RunMetrics::default()).unwrap();

        let runs = get_runs(&store, Some(2)).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].ended_at, t3);
        assert_eq!(runs[1].ended_at, t2);
    }

    #[test]
    fn compute_roi_on_empty_store_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = ctx_store::init(dir.path()).unwrap();
        let roi = compute_roi(&store).unwrap();
        assert_eq!(roi.run_count, 0);
        assert_eq!(roi.total_tokens_saved, 0);
    }

    #[test]
    fn compute_roi_aggregates_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let store = ctx_store::init(dir.path()).unwrap();
        let t1 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();

        record_run(
            &store,
            sample_run(t1, t1),
            RunMetrics { baseline_tokens: 1000, delta_tokens: 800, cache_hit_rate: 0.5, ..Default::default() },
        )
        .unwrap();
        record_run(
            &store,
            sample_run(t2, t2),
            RunMetrics { baseline_tokens: 1000, delta_tokens: 200, cache_hit_rate: 0.9, ..Default::default() },
        )
        .unwrap();

        let roi = compute_roi(&store).unwrap();
        assert_eq!(roi.run_count, 2);
        assert_eq!(roi.total_baseline_tokens, 2000);
        assert_eq!(roi.total_tokens_saved, 1000);
        assert!((roi.best_savings_percent - 80.0).abs() < f64::EPSILON);
        assert!((roi.worst_savings_percent - 20.0).abs() < f64::EPSILON);
        assert!((roi.mean_cache_hit_rate - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn estimate_baseline_sums_non_binary_non_generated_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = ctx_store::init(dir.path()).unwrap();
        let commit = "c1";
        let snapshot_dir = store.graph_snapshots_dir().join(commit);
        std::fs::create_dir_all(&snapshot_dir).unwrap();

        let snapshots = vec![
            FileSnapshot {
                commit_sha: commit.to_string(),
                path_id: "p1".to_string(),
                path: "a.go".to_string(),
                content_sha256: "x".to_string(),
                language: ctx_symbols::Language::Go,
                byte_size: 400,
                line_count: 10,
                is_binary: false,
                is_generated: false,
            },
            FileSnapshot {
                commit_sha: commit.to_string(),
                path_id: "p2".to_string(),
                path: "vendor/gen.go".to_string(),
                content_sha256: "y".to_string(),
                language: ctx_symbols::Language::Go,
                byte_size: 10_000,
                line_count: 100,
                is_binary: false,
                is_generated: true,
            },
        ];
        ctx_jsonl::write_records(&snapshot_dir.join("files.jsonl"), &snapshots).unwrap();

        let estimate = estimate_baseline(&store, commit).unwrap();
        assert_eq!(estimate, 100);
    }
}
