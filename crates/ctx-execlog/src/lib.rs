// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Execution log types and strict structural/semantic validation.
//!
//! An execution log is the raw external input a caller hands to
//! [`ctx_manifest`](../ctx_manifest/index.html) for canonicalization. It is
//! never stored as-is; it is validated here first.

use chrono::{DateTime, Utc};
use ctx_error::{CtxError, ErrorCode};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The model that produced this run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Model {
    /// Model identifier (e.g. a model name or version string). Required.
    #[serde(default)]
    pub identifier: String,
    /// Opaque model parameters (temperature, top_p, etc).
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
}

/// One entry in the ordered prompt sequence.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Prompt {
    /// The speaker role (`system`, `user`, `assistant`, ...).
    pub role: String,
    /// Prompt text content.
    pub content: String,
}

/// A named input attached to the run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct NamedInput {
    /// Input name. Required.
    #[serde(default)]
    pub name: String,
    /// Input content.
    pub content: String,
}

/// One step the agent took.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Step {
    /// Zero-based position in the step sequence.
    pub index: u32,
    /// The step's kind tag, e.g. `"tool_call"`. Required.
    #[serde(default)]
    pub kind: String,
    /// The tool invoked by this step. Required.
    #[serde(default)]
    pub tool: String,
    /// Opaque tool parameters.
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
    /// Textual output produced by this step.
    #[serde(default)]
    pub output: String,
    /// Whether this step is believed to be deterministic.
    #[serde(default)]
    pub deterministic: bool,
    /// When the step ran.
    pub timestamp: DateTime<Utc>,
}

/// A named output produced by the run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct NamedOutput {
    /// Output name. Required.
    #[serde(default)]
    pub name: String,
    /// Output content.
    pub content: String,
}

/// The environment the run executed in.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Environment {
    /// Operating system identifier. Required.
    #[serde(default)]
    pub os: String,
    /// Runtime identifier (language/runtime version). Required.
    #[serde(default)]
    pub runtime: String,
    /// Tool name → version map.
    #[serde(default)]
    pub tool_versions: BTreeMap<String, String>,
}

/// A raw, externally supplied execution log.
///
/// Structural decoding rejects unknown fields. Call [`ExecutionLog::validate`]
/// afterward to check semantic completeness.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ExecutionLog {
    /// The model that produced this run.
    pub model: Model,
    /// The system prompt text. Required (non-empty).
    #[serde(default)]
    pub system_prompt: String,
    /// Ordered prompt sequence.
    #[serde(default)]
    pub prompts: Vec<Prompt>,
    /// Named inputs.
    #[serde(default)]
    pub inputs: Vec<NamedInput>,
    /// Ordered steps.
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Named outputs.
    #[serde(default)]
    pub outputs: Vec<NamedOutput>,
    /// Execution environment.
    pub environment: Environment,
}

impl ExecutionLog {
    /// Decode an execution log from raw JSON bytes, rejecting unknown
    /// fields at every level.
    pub fn from_json(bytes: &[u8]) -> Result<Self, CtxError> {
        serde_json::from_slice(bytes).map_err(|e| {
            CtxError::new(ErrorCode::ExecLogInvalid, "execution log failed to decode")
                .with_context("reason", e.to_string())
        })
    }

    /// Check semantic completeness, collecting every missing/empty
    /// required field rather than failing on the first.
    pub fn validate(&self) -> Result<(), CtxError> {
        let mut problems = Vec::new();

        if self.model.identifier.trim().is_empty() {
            problems.push("model.identifier".to_string());
        }
        if self.system_prompt.trim().is_empty() {
            problems.push("system_prompt".to_string());
        }
        if self.environment.os.trim().is_empty() {
            problems.push("environment.os".to_string());
        }
        if self.environment.runtime.trim().is_empty() {
            problems.push("environment.runtime".to_string());
        }
        for step in &self.steps {
            if step.tool.trim().is_empty() {
                problems.push(format!("steps[{}].tool", step.index));
            }
            if step.kind.trim().is_empty() {
                problems.push(format!("steps[{}].kind", step.index));
            }
        }
        for (i, output) in self.outputs.iter().enumerate() {
            if output.name.trim().is_empty() {
                problems.push(format!("outputs[{i}].name"));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(CtxError::aggregate(
                ErrorCode::ExecLogInvalid,
                "execution log is missing required fields",
                problems,
            ))
        }
    }
}
