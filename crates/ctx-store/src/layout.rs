//! Store directory layout: creation and discovery of the `.ctx/` root.

use crate::blob::BlobStore;
use ctx_config::StoreConfig;
use ctx_error::{CtxError, ErrorCode};
use std::path::{Path, PathBuf};

/// The name of the store's hidden root directory.
pub const STORE_DIR_NAME: &str = ".ctx";

/// A handle onto an initialized store root.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    /// The store's `.ctx/` root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `objects/` blob store.
    #[must_use]
    pub fn blobs(&self) -> BlobStore {
        BlobStore::new(self.root.join("objects"))
    }

    /// The `packs/` registry directory.
    #[must_use]
    pub fn packs_dir(&self) -> PathBuf {
        self.root.join("packs")
    }

    /// The `drafts/` registry directory.
    #[must_use]
    pub fn drafts_dir(&self) -> PathBuf {
        self.root.join("drafts")
    }

    /// The `graph/manifests/` directory.
    #[must_use]
    pub fn graph_manifests_dir(&self) -> PathBuf {
        self.root.join("graph").join("manifests")
    }

    /// The `graph/snapshots/` directory.
    #[must_use]
    pub fn graph_snapshots_dir(&self) -> PathBuf {
        self.root.join("graph").join("snapshots")
    }

    /// The `cache/` directory.
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    /// The `telemetry/` directory.
    #[must_use]
    pub fn telemetry_dir(&self) -> PathBuf {
        self.root.join("telemetry")
    }
}

/// Create a new store rooted at `<dir>/.ctx`.
///
/// Fails with [`ErrorCode::StoreAlreadyInitialized`] if that directory
/// already exists.
pub fn init(dir: &Path) -> Result<Store, CtxError> {
    let root = dir.join(STORE_DIR_NAME);
    if root.exists() {
        return Err(
            CtxError::new(ErrorCode::StoreAlreadyInitialized, "store already initialized")
                .with_context("path", root.display().to_string()),
        );
    }

    for sub in ["objects", "packs", "drafts", "refs", "cache", "telemetry"] {
        std::fs::create_dir_all(root.join(sub)).map_err(|e| io_err(&root, e))?;
    }
    std::fs::create_dir_all(root.join("graph").join("manifests")).map_err(|e| io_err(&root, e))?;
    std::fs::create_dir_all(root.join("graph").join("snapshots")).map_err(|e| io_err(&root, e))?;

    let config = StoreConfig::default();
    let config_json = serde_json::to_string_pretty(&config).map_err(|e| {
        CtxError::new(ErrorCode::Internal, "failed to encode store config").with_context("error", e.to_string())
    })?;
    std::fs::write(root.join("config.json"), config_json).map_err(|e| io_err(&root, e))?;

    tracing::info!(path = %root.display(), "initialized store");

    let root = std::fs::canonicalize(&root).map_err(|e| io_err(&root, e))?;
    Ok(Store { root })
}

/// Walk upward from `cwd` looking for a `.ctx/` directory.
pub fn discover(cwd: &Path) -> Result<Store, CtxError> {
    let mut dir = cwd
        .canonicalize()
        .map_err(|e| io_err(cwd, e))?;

    loop {
        let candidate = dir.join(STORE_DIR_NAME);
        if candidate.is_dir() {
            return Ok(Store { root: candidate });
        }
        match dir.parent() {
            Some(parent) => dir = parent.to_path_buf(),
            None => {
                return Err(CtxError::new(
                    ErrorCode::StoreNotFound,
                    "no .ctx store found; run `ctx init` first",
                )
                .with_context("searched_from", cwd.display().to_string()))
            }
        }
    }
}

fn io_err(path: &Path, e: std::io::Error) -> CtxError {
    CtxError::new(ErrorCode::Internal, "I/O error in store layout")
        .with_context("path", path.display().to_string())
        .with_context("error", e.to_string())
}
