// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Content-addressed blob storage and store-root layout/discovery.

mod blob;
mod layout;

pub use blob::BlobStore;
pub use layout::{discover, init, Store, STORE_DIR_NAME};
