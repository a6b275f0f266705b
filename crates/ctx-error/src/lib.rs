// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Unified error taxonomy for the `ctx` content-addressed store.
//!
//! Every fallible library-level operation in this workspace returns
//! [`CtxError`]: a stable, machine-readable [`ErrorCode`], a human-readable
//! message, an optional cause chain, and arbitrary key-value context. Build
//! one with the fluent builder returned by [`CtxError::new`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// ErrorCategory
// ---------------------------------------------------------------------------

/// Broad family that an [`ErrorCode`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Hash reference parsing / resolution errors.
    Hash,
    /// Blob store integrity or lookup errors.
    Store,
    /// Pack manifest validation errors.
    Manifest,
    /// Execution-log validation errors.
    ExecLog,
    /// JSONL record-store errors.
    Jsonl,
    /// Git adapter / subprocess errors.
    Git,
    /// Graph indexing / delta errors.
    Graph,
    /// Drift detection errors.
    Drift,
    /// Replay engine errors.
    Replay,
    /// Optimizer errors.
    Optimizer,
    /// Cache errors.
    Cache,
    /// Telemetry errors.
    Telemetry,
    /// Pack sharing (fork / finalize / list) errors.
    Share,
    /// Sidecar provenance verification errors.
    Verify,
    /// Configuration errors.
    Config,
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Hash => "hash",
            Self::Store => "store",
            Self::Manifest => "manifest",
            Self::ExecLog => "exec_log",
            Self::Jsonl => "jsonl",
            Self::Git => "git",
            Self::Graph => "graph",
            Self::Drift => "drift",
            Self::Replay => "replay",
            Self::Optimizer => "optimizer",
            Self::Cache => "cache",
            Self::Telemetry => "telemetry",
            Self::Share => "share",
            Self::Verify => "verify",
            Self::Config => "config",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable, stable error code.
///
/// Each variant serializes to a `SCREAMING_SNAKE_CASE` string guaranteed not
/// to change across patch releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // -- Hash --
    /// A reference string failed to parse (bad prefix, wrong length, non-hex).
    HashInvalidReference,
    /// A short-hash prefix matched more than one registered pack.
    HashPrefixAmbiguous,
    /// A short-hash prefix matched no registered pack.
    HashPrefixNotFound,
    /// A short-hash prefix had fewer than 4 hex characters.
    HashPrefixTooShort,

    // -- Store --
    /// Discovery walked to the filesystem root without finding a `.ctx/` dir.
    StoreNotFound,
    /// `init` was called on a directory that already has a `.ctx/` dir.
    StoreAlreadyInitialized,
    /// A blob's recomputed hash did not match its requested reference.
    BlobIntegrityFailure,
    /// A referenced blob does not exist in the store.
    BlobNotFound,

    // -- Manifest / ExecLog --
    /// An execution log is missing one or more required fields.
    ExecLogInvalid,
    /// A pack manifest is missing one or more required fields.
    ManifestInvalid,

    // -- Jsonl --
    /// A JSONL stream contained a malformed line.
    JsonlMalformedLine,

    // -- Git --
    /// The `git` subprocess exited non-zero.
    GitSubprocessFailed,

    // -- Share --
    /// `FinalizeDraft` was called on a draft with an empty `parent`.
    ShareFinalizeWithoutParent,

    // -- Replay --
    /// A replay step's executor was not registered or raised an error.
    ReplayStepFailed,

    // -- Verify --
    /// A sidecar references a pack hash that cannot be loaded.
    VerifyBrokenProvenance,

    // -- Optimizer --
    /// A `GeneratePack` request failed basic validation (e.g. empty task).
    OptimizerInvalidRequest,

    // -- Config --
    /// A configuration file or value is invalid.
    ConfigInvalid,

    // -- Internal --
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl ErrorCode {
    /// Returns the broad [`ErrorCategory`] this code belongs to.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::HashInvalidReference
            | Self::HashPrefixAmbiguous
            | Self::HashPrefixNotFound
            | Self::HashPrefixTooShort => ErrorCategory::Hash,

            Self::StoreNotFound
            | Self::StoreAlreadyInitialized
            | Self::BlobIntegrityFailure
            | Self::BlobNotFound => ErrorCategory::Store,

            Self::ExecLogInvalid => ErrorCategory::ExecLog,
            Self::ManifestInvalid => ErrorCategory::Manifest,
            Self::JsonlMalformedLine => ErrorCategory::Jsonl,
            Self::GitSubprocessFailed => ErrorCategory::Git,
            Self::ShareFinalizeWithoutParent => ErrorCategory::Share,
            Self::ReplayStepFailed => ErrorCategory::Replay,
            Self::VerifyBrokenProvenance => ErrorCategory::Verify,
            Self::OptimizerInvalidRequest => ErrorCategory::Optimizer,
            Self::ConfigInvalid => ErrorCategory::Config,
            Self::Internal => ErrorCategory::Internal,
        }
    }

    /// Stable `&'static str` representation (e.g. `"HASH_INVALID_REFERENCE"`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HashInvalidReference => "HASH_INVALID_REFERENCE",
            Self::HashPrefixAmbiguous => "HASH_PREFIX_AMBIGUOUS",
            Self::HashPrefixNotFound => "HASH_PREFIX_NOT_FOUND",
            Self::HashPrefixTooShort => "HASH_PREFIX_TOO_SHORT",
            Self::StoreNotFound => "STORE_NOT_FOUND",
            Self::StoreAlreadyInitialized => "STORE_ALREADY_INITIALIZED",
            Self::BlobIntegrityFailure => "BLOB_INTEGRITY_FAILURE",
            Self::BlobNotFound => "BLOB_NOT_FOUND",
            Self::ExecLogInvalid => "EXEC_LOG_INVALID",
            Self::ManifestInvalid => "MANIFEST_INVALID",
            Self::JsonlMalformedLine => "JSONL_MALFORMED_LINE",
            Self::GitSubprocessFailed => "GIT_SUBPROCESS_FAILED",
            Self::ShareFinalizeWithoutParent => "SHARE_FINALIZE_WITHOUT_PARENT",
            Self::ReplayStepFailed => "REPLAY_STEP_FAILED",
            Self::VerifyBrokenProvenance => "VERIFY_BROKEN_PROVENANCE",
            Self::OptimizerInvalidRequest => "OPTIMIZER_INVALID_REQUEST",
            Self::ConfigInvalid => "CONFIG_INVALID",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CtxError
// ---------------------------------------------------------------------------

/// Unified `ctx` error.
///
/// Carries a stable [`ErrorCode`], a human-readable message, an optional
/// source error for cause-chaining, and arbitrary structured context.
///
/// # Examples
///
/// ```
/// use ctx_error::{CtxError, ErrorCode};
///
/// let err = CtxError::new(ErrorCode::BlobNotFound, "blob not found")
///     .with_context("hash", "sha256:abc123");
/// assert_eq!(err.code(), ErrorCode::BlobNotFound);
/// ```
#[derive(Debug, Clone)]
pub struct CtxError {
    code: ErrorCode,
    message: String,
    context: BTreeMap<String, serde_json::Value>,
}

impl CtxError {
    /// Start building a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: BTreeMap::new(),
        }
    }

    /// Build an aggregated error from a non-empty list of problem
    /// descriptions (e.g. missing required fields), per the "collect every
    /// failure, don't fail on the first" rule used by the execution-log
    /// parser and manifest validator.
    ///
    /// # Panics
    ///
    /// Panics if `problems` is empty; callers must check for emptiness
    /// before constructing an aggregated error.
    #[must_use]
    pub fn aggregate(code: ErrorCode, summary: &str, problems: Vec<String>) -> Self {
        assert!(!problems.is_empty(), "aggregate error with no problems");
        let message = format!("{summary}: {}", problems.join(", "));
        Self::new(code, message).with_context("problems", problems)
    }

    /// Attach a structured context key-value pair.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
        self.context.insert(key.into(), value);
        self
    }

    /// The error's stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// The human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The structured context attached to this error.
    #[must_use]
    pub fn context(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.context
    }
}

impl fmt::Display for CtxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if !self.context.is_empty() {
            write!(f, " (")?;
            for (i, (k, v)) in self.context.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{k}={v}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl std::error::Error for CtxError {}
