// SPDX-License-Identifier: MIT OR Apache-2.0
//! Workspace root crate. Carries no code of its own — it exists to host the
//! top-level `tests/` integration suite, which exercises the published
//! crates the way an external consumer would.
