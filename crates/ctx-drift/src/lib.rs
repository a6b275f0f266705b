// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Field-level drift detection between two pack manifests.
//!
//! [`diff`] never errors: two manifests are always comparable once loaded.
//! Equal hashes short-circuit to an empty report.

use ctx_manifest::PackManifest;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// What kind of difference a [`DriftEntry`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftKind {
    /// The system prompt, a prompt's role/content, or the prompt count differs.
    PromptDrift,
    /// The tool invoked at a shared step index differs.
    ToolDrift,
    /// A step's parameters differ while its tool matches.
    ParamDrift,
    /// A step's recorded output differs while its tool and parameters match.
    ReasoningDrift,
    /// A named output's content differs, or exists on only one side.
    OutputDrift,
}

impl fmt::Display for DriftKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PromptDrift => "prompt_drift",
            Self::ToolDrift => "tool_drift",
            Self::ParamDrift => "param_drift",
            Self::ReasoningDrift => "reasoning_drift",
            Self::OutputDrift => "output_drift",
        };
        f.write_str(s)
    }
}

/// A single detected difference between two packs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftEntry {
    /// What kind of drift this is.
    pub kind: DriftKind,
    /// Dot/bracket-path identifying the differing field (e.g. `"steps[2].tool"`).
    pub field: String,
    /// Value on pack A's side, as a display string.
    pub a: String,
    /// Value on pack B's side, as a display string.
    pub b: String,
}

impl fmt::Display for DriftEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {} -> {}", self.kind, self.field, self.a, self.b)
    }
}

/// The full result of comparing two packs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    /// Every detected difference, in comparison order.
    pub entries: Vec<DriftEntry>,
}

impl DriftReport {
    /// Whether any drift was detected.
    #[must_use]
    pub fn has_drift(&self) -> bool {
        !self.entries.is_empty()
    }
}

impl fmt::Display for DriftReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return writeln!(f, "no drift");
        }
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}

/// Compare two pack manifests field by field.
#[must_use]
pub fn diff(a: &PackManifest, b: &PackManifest) -> DriftReport {
    if a.hash == b.hash && !a.hash.is_empty() {
        return DriftReport::default();
    }

    let mut entries = Vec::new();
    diff_prompts(&mut entries, a, b);
    diff_steps(&mut entries, a, b);
    diff_outputs(&mut entries, a, b);
    DriftReport { entries }
}

fn diff_prompts(entries: &mut Vec<DriftEntry>, a: &PackManifest, b: &PackManifest) {
    if a.system_prompt_ref != b.system_prompt_ref {
        entries.push(DriftEntry {
            kind: DriftKind::PromptDrift,
            field: "system_prompt_ref".to_string(),
            a: ctx_hash::short(&a.system_prompt_ref, 12),
            b: ctx_hash::short(&b.system_prompt_ref, 12),
        });
    }

    let shared = a.prompts.len().min(b.prompts.len());
    for i in 0..shared {
        let pa = &a.prompts[i];
        let pb = &b.prompts[i];
        if pa.role != pb.role {
            entries.push(DriftEntry {
                kind: DriftKind::PromptDrift,
                field: format!("prompts[{i}].role"),
                a: pa.role.clone(),
                b: pb.role.clone(),
            });
        }
        if pa.content_ref != pb.content_ref {
            entries.push(DriftEntry {
                kind: DriftKind::PromptDrift,
                field: format!("prompts[{i}].content"),
                a: ctx_hash::short(&pa.content_ref, 12),
                b: ctx_hash::short(&pb.content_ref, 12),
            });
        }
    }

    if a.prompts.len() != b.prompts.len() {
        entries.push(DriftEntry {
            kind: DriftKind::PromptDrift,
            field: "prompts.len".to_string(),
            a: a.prompts.len().to_string(),
            b: b.prompts.len().to_string(),
        });
    }
}

fn diff_steps(entries: &mut Vec<DriftEntry>, a: &PackManifest, b: &PackManifest) {
    let shared = a.steps.len().min(b.steps.len());
    for i in 0..shared {
        let sa = &a.steps[i];
        let sb = &b.steps[i];

        if sa.tool != sb.tool {
            entries.push(DriftEntry {
                kind: DriftKind::ToolDrift,
                field: format!("steps[{i}].tool"),
                a: sa.tool.clone(),
                b: sb.tool.clone(),
            });
            continue;
        }

        if sa.parameters != sb.parameters {
            entries.push(DriftEntry {
                kind: DriftKind::ParamDrift,
                field: format!("steps[{i}].parameters"),
                a: params_to_string(&sa.parameters),
                b: params_to_string(&sb.parameters),
            });
        }

        if sa.output_ref != sb.output_ref {
            entries.push(DriftEntry {
                kind: DriftKind::ReasoningDrift,
                field: format!("steps[{i}].output"),
                a: ctx_hash::short(&sa.output_ref, 12),
                b: ctx_hash::short(&sb.output_ref, 12),
            });
        }
    }

    let (longer, prefix, start) = if a.steps.len() > b.steps.len() {
        (&a.steps, "a", shared)
    } else {
        (&b.steps, "b", shared)
    };
    for (i, step) in longer.iter().enumerate().skip(start) {
        entries.push(DriftEntry {
            kind: DriftKind::ToolDrift,
            field: format!("steps[{i}].tool"),
            a: if prefix == "a" { step.tool.clone() } else { "(absent)".to_string() },
            b: if prefix == "b" { step.tool.clone() } else { "(absent)".to_string() },
        });
    }
}

fn params_to_string(params: &BTreeMap<String, serde_json::Value>) -> String {
    serde_json::to_string(params).unwrap_or_default()
}

fn diff_outputs(entries: &mut Vec<DriftEntry>, a: &PackManifest, b: &PackManifest) {
    let a_map: BTreeMap<&str, &str> =
        a.outputs.iter().map(|o| (o.name.as_str(), o.content_ref.as_str())).collect();
    let b_map: BTreeMap<&str, &str> =
        b.outputs.iter().map(|o| (o.name.as_str(), o.content_ref.as_str())).collect();

    let mut names: Vec<&str> = a_map.keys().chain(b_map.keys()).copied().collect();
    names.sort_unstable();
    names.dedup();

    for name in names {
        match (a_map.get(name), b_map.get(name)) {
            (Some(ra), Some(rb)) if ra != rb => entries.push(DriftEntry {
                kind: DriftKind::OutputDrift,
                field: format!("outputs[{name}]"),
                a: ctx_hash::short(ra, 12),
                b: ctx_hash::short(rb, 12),
            }),
            (Some(_), None) => entries.push(DriftEntry {
                kind: DriftKind::OutputDrift,
                field: format!("outputs[{name}]"),
                a: "present".to_string(),
                b: "absent".to_string(),
            }),
            (None, Some(_)) => entries.push(DriftEntry {
                kind: DriftKind::OutputDrift,
                field: format!("outputs[{name}]"),
                a: "absent".to_string(),
                b: "present".to_string(),
            }),
            _ => {}
        }
    }
}
