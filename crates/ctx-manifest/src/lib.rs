// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Pack manifests: the canonical, blob-referenced form of an execution log.
//!
//! A manifest's identity is the hash of its own canonical serialization
//! with the `hash` field cleared — the manifest hashes itself.

mod canonical;

pub use canonical::canonical_string;

use chrono::{DateTime, Utc};
use ctx_error::{CtxError, ErrorCode};
use ctx_execlog::{Environment, ExecutionLog, Model};
use ctx_store::Store;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Manifest schema version. Bump only on a breaking format change.
pub const MANIFEST_VERSION: &str = "0.1";

/// A manifest prompt entry: role plus a blob reference to its content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManifestPrompt {
    /// Speaker role.
    pub role: String,
    /// Blob reference to the prompt's content.
    pub content_ref: String,
}

/// A manifest input entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManifestInput {
    /// Input name.
    pub name: String,
    /// Blob reference to the input's content.
    pub content_ref: String,
    /// Size of the content in bytes.
    pub size_bytes: u64,
}

/// A manifest step entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManifestStep {
    /// Zero-based position in the step sequence.
    pub index: u32,
    /// The step's kind tag.
    pub kind: String,
    /// The tool invoked.
    pub tool: String,
    /// Opaque tool parameters.
    pub parameters: BTreeMap<String, serde_json::Value>,
    /// Blob reference to the step's textual output.
    pub output_ref: String,
    /// Whether this step is believed to be deterministic.
    pub deterministic: bool,
    /// When the step ran.
    pub timestamp: DateTime<Utc>,
}

/// A manifest output entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManifestOutput {
    /// Output name.
    pub name: String,
    /// Blob reference to the output's content.
    pub content_ref: String,
    /// Back-reference to the owning pack's hash, set after the pack's
    /// identity is computed.
    pub context_pack: String,
}

/// The canonical, blob-referenced form of an execution log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackManifest {
    /// Manifest schema version.
    pub version: String,
    /// Creation timestamp, UTC.
    pub created: DateTime<Utc>,
    /// The model that produced this run.
    pub model: Model,
    /// Blob reference to the system prompt.
    pub system_prompt_ref: String,
    /// Ordered prompts.
    pub prompts: Vec<ManifestPrompt>,
    /// Named inputs.
    pub inputs: Vec<ManifestInput>,
    /// Ordered steps.
    pub steps: Vec<ManifestStep>,
    /// Named outputs.
    pub outputs: Vec<ManifestOutput>,
    /// Execution environment.
    pub environment: Environment,
    /// Parent pack hash, set by fork. Empty for an original pack.
    pub parent: String,
    /// This pack's own identity hash. Empty until [`create`] computes it.
    pub hash: String,
}

impl PackManifest {
    /// Check semantic completeness, collecting every missing field.
    pub fn validate(&self) -> Result<(), CtxError> {
        let mut problems = Vec::new();
        if self.version.trim().is_empty() {
            problems.push("version".to_string());
        }
        if self.model.identifier.trim().is_empty() {
            problems.push("model.identifier".to_string());
        }
        if self.system_prompt_ref.trim().is_empty() {
            problems.push("system_prompt_ref".to_string());
        }
        if self.environment.os.trim().is_empty() {
            problems.push("environment.os".to_string());
        }
        if self.environment.runtime.trim().is_empty() {
            problems.push("environment.runtime".to_string());
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(CtxError::aggregate(
                ErrorCode::ManifestInvalid,
                "pack manifest is missing required fields",
                problems,
            ))
        }
    }

    /// Compute the canonical serialization with `hash` cleared.
    fn canonical_with_hash_cleared(&self) -> String {
        let mut cleared = self.clone();
        cleared.hash = String::new();
        let value = serde_json::to_value(&cleared).expect("manifest always serializes");
        canonical_string(&value)
    }
}

/// Build a [`PackManifest`] from a validated execution log, writing every
/// large string as a blob and assigning the manifest's own identity hash.
pub fn create(store: &Store, log: &ExecutionLog) -> Result<PackManifest, CtxError> {
    log.validate()?;
    let blobs = store.blobs();

    let system_prompt_ref = blobs.write(log.system_prompt.as_bytes())?;

    let prompts = log
        .prompts
        .iter()
        .map(|p| -> Result<ManifestPrompt, CtxError> {
            Ok(ManifestPrompt {
                role: p.role.clone(),
                content_ref: blobs.write(p.content.as_bytes())?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let inputs = log
        .inputs
        .iter()
        .map(|i| -> Result<ManifestInput, CtxError> {
            Ok(ManifestInput {
                name: i.name.clone(),
                content_ref: blobs.write(i.content.as_bytes())?,
                size_bytes: i.content.len() as u64,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let steps = log
        .steps
        .iter()
        .map(|s| -> Result<ManifestStep, CtxError> {
            Ok(ManifestStep {
                index: s.index,
                kind: s.kind.clone(),
                tool: s.tool.clone(),
                parameters: s.parameters.clone(),
                output_ref: blobs.write(s.output.as_bytes())?,
                deterministic: s.deterministic,
                timestamp: s.timestamp,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut outputs = log
        .outputs
        .iter()
        .map(|o| -> Result<ManifestOutput, CtxError> {
            Ok(ManifestOutput {
                name: o.name.clone(),
                content_ref: blobs.write(o.content.as_bytes())?,
                context_pack: String::new(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut manifest = PackManifest {
        version: MANIFEST_VERSION.to_string(),
        created: Utc::now(),
        model: log.model.clone(),
        system_prompt_ref,
        prompts,
        inputs,
        steps,
        outputs: Vec::new(),
        environment: log.environment.clone(),
        parent: String::new(),
        hash: String::new(),
    };
    manifest.outputs = std::mem::take(&mut outputs);

    let canonical = manifest.canonical_with_hash_cleared();
    let hash = blobs.write(canonical.as_bytes())?;
    manifest.hash = hash.clone();
    for output in &mut manifest.outputs {
        output.context_pack = hash.clone();
    }

    Ok(manifest)
}

/// Register a finalized pack hash under the store's `packs/` registry.
/// A no-op if already registered.
pub fn register(store: &Store, hash: &str) -> Result<(), CtxError> {
    let (_, hex) = ctx_hash::parse(hash)?;
    let packs_dir = store.packs_dir();
    std::fs::create_dir_all(&packs_dir).map_err(|e| io_err(e))?;
    let path = packs_dir.join(hex);
    if path.exists() {
        return Ok(());
    }
    std::fs::write(&path, hash.as_bytes()).map_err(|e| io_err(e))
}

/// Resolve `raw` to a full reference, read and parse its manifest blob, and
/// set its `hash` field from the resolved reference.
pub fn load(store: &Store, raw: &str) -> Result<PackManifest, CtxError> {
    let resolved = ctx_hash::resolve(&store.packs_dir(), raw)?;
    let bytes = store.blobs().read(&resolved)?;
    let mut manifest: PackManifest = serde_json::from_slice(&bytes).map_err(|e| {
        CtxError::new(ErrorCode::ManifestInvalid, "pack manifest failed to decode")
            .with_context("reason", e.to_string())
    })?;
    manifest.hash = resolved;
    Ok(manifest)
}

fn io_err(e: std::io::Error) -> CtxError {
    CtxError::new(ErrorCode::Internal, "I/O error registering pack").with_context("error", e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctx_execlog::{NamedOutput, Step};

    fn sample_log() -> ExecutionLog {
        ExecutionLog {
            model: Model {
                identifier: "gpt-5".to_string(),
                parameters: BTreeMap::new(),
            },
            system_prompt: "be helpful".to_string(),
            prompts: vec![],
            inputs: vec![],
            steps: vec![Step {
                index: 0,
                kind: "tool_call".to_string(),
                tool: "read_file".to_string(),
                parameters: BTreeMap::new(),
                output: "file contents".to_string(),
                deterministic: true,
                timestamp: Utc::now(),
            }],
            outputs: vec![NamedOutput {
                name: "result".to_string(),
                content: "final answer".to_string(),
            }],
            environment: Environment {
                os: "linux".to_string(),
                runtime: "rust-1.80".to_string(),
                tool_versions: BTreeMap::new(),
            },
        }
    }

    #[test]
    fn create_produces_valid_manifest_with_hash() {
        let dir = tempfile::tempdir().unwrap();
        let store = ctx_store::init(dir.path()).unwrap();
        let manifest = create(&store, &sample_log()).unwrap();
        assert!(manifest.validate().is_ok());
        assert!(!manifest.hash.is_empty());
        assert_eq!(manifest.outputs[0].context_pack, manifest.hash);
    }

    #[test]
    fn create_is_deterministic_for_canonical_bytes_given_fixed_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let store = ctx_store::init(dir.path()).unwrap();
        let m1 = create(&store, &sample_log()).unwrap();
        let mut m2 = m1.clone();
        m2.hash = String::new();
        assert_eq!(m1.canonical_with_hash_cleared(), m2.canonical_with_hash_cleared());
    }

    #[test]
    fn register_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ctx_store::init(dir.path()).unwrap();
        let manifest = create(&store, &sample_log()).unwrap();
        register(&store, &manifest.hash).unwrap();

        let loaded = load(&store, &manifest.hash).unwrap();
        assert_eq!(loaded.hash, manifest.hash);
        assert_eq!(loaded.model.identifier, "gpt-5");
    }

    #[test]
    fn register_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = ctx_store::init(dir.path()).unwrap();
        let manifest = create(&store, &sample_log()).unwrap();
        register(&store, &manifest.hash).unwrap();
        register(&store, &manifest.hash).unwrap();
    }

    #[test]
    fn validate_reports_missing_fields() {
        let mut manifest = PackManifest {
            version: String::new(),
            created: Utc::now(),
            model: Model {
                identifier: String::new(),
                parameters: BTreeMap::new(),
            },
            system_prompt_ref: String::new(),
            prompts: vec![],
            inputs: vec![],
            steps: vec![],
            outputs: vec![],
            environment: Environment {
                os: String::new(),
                runtime: "rust".to_string(),
                tool_versions: BTreeMap::new(),
            },
            parent: String::new(),
            hash: String::new(),
        };
        let err = manifest.validate().unwrap_err();
        assert!(err.message().contains("version"));
        assert!(err.message().contains("model.identifier"));
        assert!(err.message().contains("system_prompt_ref"));
        assert!(err.message().contains("environment.os"));
        manifest.environment.os = "linux".to_string();
    }
}
