//! Build workspace layout

use crate::error::{PkgflowError, PkgflowResult};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Directory the packaging tool reads its cache from and writes it back to
const CACHE_DIR: &str = "cache";
/// Directory the packaging tool writes the package into
const OUTPUT_DIR: &str = "output";

/// Scratch directories for one build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub root: PathBuf,
    pub cache_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Workspace {
    /// Layout under `root` without touching the filesystem
    pub fn at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            cache_dir: root.join(CACHE_DIR),
            output_dir: root.join(OUTPUT_DIR),
            root,
        }
    }

    /// Remove whatever is left at `root` and create an empty layout.
    pub async fn prepare(root: impl Into<PathBuf>) -> PkgflowResult<Self> {
        let workspace = Self::at(root);
        info!("Setting up workspace at {}", workspace.root.display());

        match fs::remove_dir_all(&workspace.root).await {
            Ok(()) => debug!("Removed previous workspace contents"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(workspace.setup_error(e)),
        }

        for dir in [&workspace.cache_dir, &workspace.output_dir] {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| workspace.setup_error(e))?;
        }

        Ok(workspace)
    }

    /// Paths handed to the cache store
    pub fn cache_paths(&self) -> Vec<PathBuf> {
        vec![self.cache_dir.clone()]
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn setup_error(&self, source: io::Error) -> PkgflowError {
        PkgflowError::WorkspaceSetup {
            path: self.root.clone(),
            source,
        }
    }
}
