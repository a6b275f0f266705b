// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Canonical hash reference encoding, parsing, normalization, and
//! prefix-based resolution.
//!
//! A hash reference has the canonical form `sha256:<64-lowercase-hex>`. A
//! "short" form is any hex prefix of that string with at least 4 characters,
//! and `ctx://<hex>` is an accepted alternate spelling on input.

use ctx_error::{CtxError, ErrorCode};
use sha2::{Digest, Sha256};
use std::path::Path;

/// The only hash algorithm this store currently speaks.
pub const ALGORITHM: &str = "sha256";

/// Length in hex characters of a full SHA-256 digest.
pub const HEX_LEN: usize = 64;

/// Minimum number of hex characters accepted as a resolvable short prefix.
pub const MIN_PREFIX_LEN: usize = 4;

/// Compute the canonical hash reference of a byte sequence.
///
/// # Examples
///
/// ```
/// let r = ctx_hash::hash_content(b"hello");
/// assert!(r.starts_with("sha256:"));
/// assert_eq!(r.len(), "sha256:".len() + 64);
/// ```
#[must_use]
pub fn hash_content(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{ALGORITHM}:{:x}", hasher.finalize())
}

/// Split a canonical reference into its algorithm tag and lowercase hex
/// digest, rejecting a missing prefix, wrong-length digest, or non-hex
/// characters.
pub fn parse(reference: &str) -> Result<(&str, &str), CtxError> {
    let Some((algo, hex)) = reference.split_once(':') else {
        return Err(invalid(reference, "missing 'sha256:' prefix"));
    };
    if algo != ALGORITHM {
        return Err(invalid(reference, "unsupported hash algorithm"));
    }
    if hex.len() != HEX_LEN {
        return Err(invalid(reference, "hex digest must be 64 characters"));
    }
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid(reference, "hex digest contains non-hex characters"));
    }
    Ok((algo, hex))
}

/// Accept either a full `sha256:<hex>` reference or a bare 64-character hex
/// digest, lower-casing it and returning the canonical form. Anything else
/// of full digest length is rejected.
pub fn normalize(raw: &str) -> Result<String, CtxError> {
    if let Some((_, hex)) = raw.split_once(':') {
        let (_, hex) = parse(raw)?;
        return Ok(format!("{ALGORITHM}:{}", hex.to_ascii_lowercase()));
    }
    if raw.len() == HEX_LEN && raw.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Ok(format!("{ALGORITHM}:{}", raw.to_ascii_lowercase()));
    }
    Err(invalid(raw, "not a full reference or 64-hex digest"))
}

/// Truncate the hex portion of a reference to `n` characters, capped at the
/// digest's own length.
///
/// # Examples
///
/// ```
/// let r = ctx_hash::hash_content(b"hello");
/// let s = ctx_hash::short(&r, 8);
/// assert_eq!(s.len(), 8);
/// ```
#[must_use]
pub fn short(reference: &str, n: usize) -> String {
    let hex = reference.split_once(':').map_or(reference, |(_, h)| h);
    let cap = n.min(hex.len());
    hex[..cap].to_string()
}

fn invalid(raw: &str, reason: &str) -> CtxError {
    CtxError::new(ErrorCode::HashInvalidReference, reason).with_context("input", raw)
}

/// Resolve a raw hash string — full reference, bare hex, `ctx://` URI, or a
/// short prefix of at least [`MIN_PREFIX_LEN`] hex characters — to the one
/// full reference it denotes, consulting the store's `packs/` registry
/// directory for prefix matches.
///
/// `packs_dir` is the store's `packs/` directory, whose entry names are the
/// hex portions of registered pack hashes.
pub fn resolve(packs_dir: &Path, raw: &str) -> Result<String, CtxError> {
    let raw = raw.strip_prefix("ctx://").unwrap_or(raw);

    if let Ok(full) = normalize(raw) {
        return Ok(full);
    }

    let prefix = raw.to_ascii_lowercase();
    if prefix.len() < MIN_PREFIX_LEN {
        return Err(
            CtxError::new(ErrorCode::HashPrefixTooShort, "prefix must be at least 4 hex characters")
                .with_context("input", raw),
        );
    }
    if !prefix.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid(raw, "prefix contains non-hex characters"));
    }

    let mut matches = Vec::new();
    let entries = std::fs::read_dir(packs_dir).map_err(|e| {
        CtxError::new(ErrorCode::HashPrefixNotFound, "packs registry unreadable")
            .with_context("error", e.to_string())
    })?;
    for entry in entries {
        let entry = entry.map_err(|e| {
            CtxError::new(ErrorCode::HashPrefixNotFound, "packs registry unreadable")
                .with_context("error", e.to_string())
        })?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(&prefix) {
            matches.push(name.into_owned());
        }
    }

    match matches.len() {
        0 => Err(
            CtxError::new(ErrorCode::HashPrefixNotFound, "no pack matches prefix")
                .with_context("prefix", raw),
        ),
        1 => Ok(format!("{ALGORITHM}:{}", matches.remove(0))),
        _ => {
            matches.sort();
            Err(
                CtxError::new(ErrorCode::HashPrefixAmbiguous, "prefix matches multiple packs")
                    .with_context("prefix", raw)
                    .with_context("matches", matches),
            )
        }
    }
}
