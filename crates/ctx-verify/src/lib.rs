// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Boundary verification of externally produced artifacts against their
//! recorded provenance.
//!
//! An artifact written outside the store carries a sidecar file,
//! `<artifact>.ctx.json`, naming the context pack and inputs that produced
//! it. [`verify_artifact`] loads that provenance, re-hashes the artifact,
//! and reports whether it still matches what the pack recorded.

use ctx_error::{CtxError, ErrorCode};
use ctx_store::Store;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The `<artifact>.ctx.json` sidecar, recording the provenance of an
/// externally written artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactSidecar {
    /// Hash reference of the context pack that produced this artifact.
    pub context_pack: String,
    /// Hash references of the inputs consumed while producing it.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Names of the tools invoked while producing it.
    #[serde(default)]
    pub tools: Vec<String>,
    /// Self-reported confidence, if the producer supplied one.
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Free-text notes, if the producer supplied any.
    #[serde(default)]
    pub notes: Option<String>,
    /// Name of the pack output this artifact corresponds to.
    pub output_name: String,
}

/// Result of a single check performed during verification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerificationCheck {
    /// Name of the check.
    pub name: String,
    /// Whether it passed.
    pub passed: bool,
    /// Human-readable detail.
    pub detail: String,
}

/// Aggregated result of verifying one artifact against its sidecar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerificationReport {
    /// The pack hash named by the sidecar.
    pub pack_hash: String,
    /// Individual checks performed.
    pub checks: Vec<VerificationCheck>,
    /// `true` only if every check passed.
    pub passed: bool,
}

/// Read `<artifact>.ctx.json`, load the referenced pack, hash the artifact
/// bytes, and report whether they match the named output's recorded
/// content.
///
/// A pack that fails to load is a distinct, harder failure
/// ([`ErrorCode::VerifyBrokenProvenance`]) from a content mismatch, which
/// is reported as a failed check rather than an `Err`.
pub fn verify_artifact(store: &Store, artifact_path: &Path) -> Result<VerificationReport, CtxError> {
    let sidecar_path = sidecar_path(artifact_path);
    let sidecar_bytes = std::fs::read(&sidecar_path).map_err(|e| io_err(&sidecar_path, e))?;
    let sidecar: ArtifactSidecar = serde_json::from_slice(&sidecar_bytes).map_err(|e| {
        CtxError::new(ErrorCode::ManifestInvalid, "sidecar failed to decode")
            .with_context("path", sidecar_path.display().to_string())
            .with_context("reason", e.to_string())
    })?;

    let manifest = ctx_manifest::load(store, &sidecar.context_pack).map_err(|e| {
        CtxError::new(ErrorCode::VerifyBrokenProvenance, "sidecar references a pack that failed to load")
            .with_context("context_pack", sidecar.context_pack.clone())
            .with_context("reason", e.message().to_string())
    })?;

    let mut checks = Vec::new();

    let blobs = store.blobs();
    for input_ref in &sidecar.inputs {
        let exists = blobs.exists(input_ref);
        checks.push(VerificationCheck {
            name: format!("input_available:{input_ref}"),
            passed: exists,
            detail: if exists { "input blob present".to_string() } else { "input blob missing".to_string() },
        });
    }

    let artifact_bytes = std::fs::read(artifact_path).map_err(|e| io_err(artifact_path, e))?;
    let actual_hash = ctx_hash::hash_content(&artifact_bytes);

    match manifest.outputs.iter().find(|o| o.name == sidecar.output_name) {
        None => checks.push(VerificationCheck {
            name: "output_named".to_string(),
            passed: false,
            detail: format!("pack has no output named \"{}\"", sidecar.output_name),
        }),
        Some(output) => {
            let matched = output.content_ref == actual_hash;
            checks.push(VerificationCheck {
                name: "content_match".to_string(),
                passed: matched,
                detail: if matched {
                    "artifact bytes match recorded output".to_string()
                } else {
                    format!(
                        "artifact hash {} does not match recorded {}",
                        ctx_hash::short(&actual_hash, 8),
                        ctx_hash::short(&output.content_ref, 8)
                    )
                },
            });
        }
    }

    let passed = checks.iter().all(|c| c.passed);
    Ok(VerificationReport { pack_hash: manifest.hash, checks, passed })
}

fn sidecar_path(artifact_path: &Path) -> std::path::PathBuf {
    let mut name = artifact_path.as_os_str().to_os_string();
    name.push(".ctx.json");
    std::path::PathBuf::from(name)
}

fn io_err(path: &Path, e: std::io::Error) -> CtxError {
    CtxError::new(ErrorCode::Internal, "I/O error during verification")
        .with_context("path", path.display().to_string())
        .with_context("error", e.to_string())
}
