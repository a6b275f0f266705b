// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Commit-scoped context graph: indexes a git repository's history into
//! per-commit JSONL streams of symbols, regions, and edges, and computes
//! path-level deltas between two indexed commits.

mod delta;
mod indexer;
mod path;
mod records;

pub use delta::{compute_delta, Delta, DeltaEntry};
pub use indexer::{index_commit, index_range};
pub use path::path_id;
pub use records::{
    CallEdgeRecord, CommitRecord, FileSnapshot, ImportEdgeRecord, PathRecord, RegionRecord,
    SymbolRecord,
};
