//! Package artifact discovery
//!
//! The packaging tool writes exactly one `.deb` or `.rpm` into the output
//! directory. The scan takes the first match in directory enumeration order;
//! any further matches are reported and ignored.

use crate::error::{PkgflowError, PkgflowResult};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Supported package formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Deb,
    Rpm,
}

impl ArtifactKind {
    /// Classify a file name by extension
    pub fn from_file_name(name: &str) -> Option<Self> {
        if name.ends_with(".deb") {
            Some(Self::Deb)
        } else if name.ends_with(".rpm") {
            Some(Self::Rpm)
        } else {
            None
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Deb => "deb",
            Self::Rpm => "rpm",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A built package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
    /// File name (e.g. `acme_1.2.0-1700000000.ubuntu_amd64.deb`)
    pub name: String,
    pub size_bytes: u64,
}

impl Artifact {
    /// Describe an existing file as an artifact, if it has a package extension
    pub fn from_path(path: &Path) -> PkgflowResult<Option<Self>> {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return Ok(None);
        };
        let Some(kind) = ArtifactKind::from_file_name(name) else {
            return Ok(None);
        };
        let metadata = fs::metadata(path)
            .map_err(|e| PkgflowError::io(format!("reading metadata of {}", path.display()), e))?;

        Ok(Some(Self {
            path: path.to_path_buf(),
            kind,
            name: name.to_string(),
            size_bytes: metadata.len(),
        }))
    }

    /// SHA256 of the package contents, hex encoded
    pub fn sha256(&self) -> PkgflowResult<String> {
        let mut file = File::open(&self.path)
            .map_err(|e| PkgflowError::io(format!("opening {}", self.path.display()), e))?;
        let mut hasher = Sha256::new();
        io::copy(&mut file, &mut hasher)
            .map_err(|e| PkgflowError::io(format!("hashing {}", self.path.display()), e))?;
        Ok(hex::encode(hasher.finalize()))
    }

    /// Size in MiB, as shown in upload logs
    pub fn size_mib(&self) -> f64 {
        self.size_bytes as f64 / 1024.0 / 1024.0
    }
}

/// Find the package in `output_dir`.
///
/// Only direct entries are scanned. Enumeration order is whatever the
/// filesystem returns, so with several packages the pick is not stable.
pub fn locate_artifact(output_dir: &Path) -> PkgflowResult<Artifact> {
    let entries = fs::read_dir(output_dir).map_err(|e| {
        PkgflowError::io(format!("reading output directory {}", output_dir.display()), e)
    })?;

    let mut found: Option<Artifact> = None;
    for entry in entries {
        let entry = entry.map_err(|e| {
            PkgflowError::io(format!("reading output directory {}", output_dir.display()), e)
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        match (&found, Artifact::from_path(&path)?) {
            (None, Some(artifact)) => {
                debug!("Found {} package: {}", artifact.kind, artifact.name);
                found = Some(artifact);
            }
            (Some(first), Some(extra)) => {
                warn!("Ignoring extra package {} (using {})", extra.name, first.name);
            }
            (_, None) => {}
        }
    }

    found.ok_or_else(|| PkgflowError::NoArtifactFound(output_dir.to_path_buf()))
}
