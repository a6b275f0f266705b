// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Append-only and write-all JSONL record streams.
//!
//! Every record is one JSON value per line. Readers tolerate blank lines
//! and report the first malformed line they hit rather than aborting
//! silently; writers never emit one.

use ctx_error::{CtxError, ErrorCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Lines longer than this are treated as a malformed-line error rather than
/// read into memory whole.
pub const MAX_LINE_BYTES: usize = 10 * 1024 * 1024;

/// Append a single record as one JSON line, creating the file and its
/// parent directories if needed.
pub fn append_record<T: Serialize>(path: &Path, value: &T) -> Result<(), CtxError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(path, e))?;
    }
    let mut line = serde_json::to_string(value).map_err(|e| encode_err(path, e))?;
    line.push('\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| io_err(path, e))?;
    file.write_all(line.as_bytes()).map_err(|e| io_err(path, e))
}

/// Truncate-create `path` and write each value as its own JSON line.
///
/// Does not sort; callers who need reproducible bytes across runs must sort
/// `values` themselves before calling.
pub fn write_records<T: Serialize>(path: &Path, values: &[T]) -> Result<(), CtxError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(path, e))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(|e| io_err(path, e))?;
    for value in values {
        let mut line = serde_json::to_string(value).map_err(|e| encode_err(path, e))?;
        line.push('\n');
        file.write_all(line.as_bytes()).map_err(|e| io_err(path, e))?;
    }
    file.flush().map_err(|e| io_err(path, e))
}

/// Read every record in `path`, skipping blank lines.
///
/// Returns an empty vector if `path` does not exist. Stops at the first
/// line that fails to decode and reports its 1-based line number.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, CtxError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = std::fs::File::open(path).map_err(|e| io_err(path, e))?;
    let mut reader = BufReader::new(file);
    let mut records = Vec::new();
    let mut line_no = 0usize;

    loop {
        let mut buf = Vec::new();
        let read = read_line_limited(&mut reader, &mut buf, path, line_no + 1)?;
        if read == 0 {
            break;
        }
        line_no += 1;
        let line = String::from_utf8_lossy(&buf);
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(trimmed).map_err(|e| {
            CtxError::new(ErrorCode::JsonlMalformedLine, "malformed JSONL line")
                .with_context("path", path.display().to_string())
                .with_context("line", line_no)
                .with_context("reason", e.to_string())
        })?;
        records.push(record);
    }
    Ok(records)
}

fn read_line_limited(
    reader: &mut impl BufRead,
    buf: &mut Vec<u8>,
    path: &Path,
    line_no: usize,
) -> Result<usize, CtxError> {
    let read = reader.read_until(b'\n', buf).map_err(|e| io_err(path, e))?;
    if buf.len() > MAX_LINE_BYTES {
        return Err(
            CtxError::new(ErrorCode::JsonlMalformedLine, "line exceeds maximum length")
                .with_context("path", path.display().to_string())
                .with_context("line", line_no)
                .with_context("max_bytes", MAX_LINE_BYTES),
        );
    }
    Ok(read)
}

fn io_err(path: &Path, e: std::io::Error) -> CtxError {
    CtxError::new(ErrorCode::JsonlMalformedLine, "I/O error on JSONL file")
        .with_context("path", path.display().to_string())
        .with_context("error", e.to_string())
}

fn encode_err(path: &Path, e: serde_json::Error) -> CtxError {
    CtxError::new(ErrorCode::JsonlMalformedLine, "failed to encode record")
        .with_context("path", path.display().to_string())
        .with_context("error", e.to_string())
}
