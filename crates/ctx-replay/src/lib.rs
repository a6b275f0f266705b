// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Deterministic replay of a recorded pack's steps against registered tool
//! executors, reporting per-step fidelity against what was originally
//! recorded.

mod executor;

pub use executor::{ExecutorRegistry, ReadFileExecutor, ToolExecutor};

use chrono::{DateTime, Utc};
use ctx_error::CtxError;
use ctx_store::Store;
use serde::{Deserialize, Serialize};

/// A gap between the recorded environment/inputs and what replay observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplayDrift {
    /// The OS recorded at capture time differs from the one replaying.
    EnvironmentDrift {
        /// OS recorded in the pack.
        recorded: String,
        /// OS replay is actually running on.
        actual: String,
    },
    /// A recorded input's blob is no longer present in the store.
    MissingInput {
        /// The input's name.
        name: String,
        /// Its blob reference.
        content_ref: String,
    },
}

/// How a single step's replayed output compared to what was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// The replayed output's hash matched the recorded `output_ref`.
    Matched,
    /// The replayed output differed from the recorded one.
    Diverged,
    /// The executor errored, or no executor was registered for the tool.
    Failed,
}

/// The result of replaying one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// The step's position in the pack.
    pub index: u32,
    /// The tool it invoked.
    pub tool: String,
    /// What happened.
    pub outcome: StepOutcome,
    /// Failure or divergence detail, if any.
    pub reason: Option<String>,
}

/// Overall replay fidelity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fidelity {
    /// Every step matched.
    Exact,
    /// At least one deterministic step diverged, but nothing failed.
    Degraded,
    /// At least one step failed.
    Failed,
}

impl Fidelity {
    /// The CLI exit code this fidelity level maps to: 0/1/2.
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Exact => 0,
            Self::Degraded => 1,
            Self::Failed => 2,
        }
    }
}

/// The full result of replaying a pack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayReport {
    /// The pack that was replayed.
    pub pack_hash: String,
    /// When replay began.
    pub started_at: DateTime<Utc>,
    /// When replay finished.
    pub ended_at: DateTime<Utc>,
    /// Per-step results, in step order.
    pub steps: Vec<StepResult>,
    /// Environment/input drift observed before stepping began.
    pub drift: Vec<ReplayDrift>,
    /// Overall fidelity.
    pub fidelity: Fidelity,
}

/// Load the pack at `pack_ref` and replay its steps against `registry`.
pub fn replay(store: &Store, pack_ref: &str, registry: &ExecutorRegistry) -> Result<ReplayReport, CtxError> {
    let started_at = Utc::now();
    let manifest = ctx_manifest::load(store, pack_ref)?;

    let mut drift = Vec::new();
    let running_os = std::env::consts::OS;
    if manifest.environment.os != running_os {
        drift.push(ReplayDrift::EnvironmentDrift {
            recorded: manifest.environment.os.clone(),
            actual: running_os.to_string(),
        });
    }

    let blobs = store.blobs();
    for input in &manifest.inputs {
        if !blobs.exists(&input.content_ref) {
            drift.push(ReplayDrift::MissingInput {
                name: input.name.clone(),
                content_ref: input.content_ref.clone(),
            });
        }
    }

    let mut steps = Vec::with_capacity(manifest.steps.len());
    let mut any_failed = false;
    let mut any_deterministic_diverged = false;

    for step in &manifest.steps {
        let result = match registry.get(&step.tool) {
            None => StepResult {
                index: step.index,
                tool: step.tool.clone(),
                outcome: StepOutcome::Failed,
                reason: Some(format!("tool not available: {}", step.tool)),
            },
            Some(executor) => match executor.execute(&step.parameters) {
                Err(reason) => StepResult {
                    index: step.index,
                    tool: step.tool.clone(),
                    outcome: StepOutcome::Failed,
                    reason: Some(reason),
                },
                Ok(output) => {
                    let actual_ref = ctx_hash::hash_content(output.as_bytes());
                    if actual_ref == step.output_ref {
                        StepResult {
                            index: step.index,
                            tool: step.tool.clone(),
                            outcome: StepOutcome::Matched,
                            reason: None,
                        }
                    } else {
                        if step.deterministic {
                            any_deterministic_diverged = true;
                        }
                        StepResult {
                            index: step.index,
                            tool: step.tool.clone(),
                            outcome: StepOutcome::Diverged,
                            reason: Some(format!(
                                "expected {}, got {}",
                                ctx_hash::short(&step.output_ref, 8),
                                ctx_hash::short(&actual_ref, 8)
                            )),
                        }
                    }
                }
            },
        };
        if result.outcome == StepOutcome::Failed {
            any_failed = true;
        }
        steps.push(result);
    }

    let fidelity = if any_failed {
        Fidelity::Failed
    } else if any_deterministic_diverged {
        Fidelity::Degraded
    } else {
        Fidelity::Exact
    };

    let ended_at = Utc::now();
    tracing::info!(pack = %manifest.hash, ?fidelity, "replay complete");

    Ok(ReplayReport { pack_hash: manifest.hash, started_at, ended_at, steps, drift, fidelity })
}
