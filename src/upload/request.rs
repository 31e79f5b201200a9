//! Upload request validation
//!
//! Everything here runs before the first network call, so malformed input
//! fails fast instead of burning retries.

use crate::artifact::ArtifactKind;
use crate::error::{PkgflowError, PkgflowResult};
use std::path::{Path, PathBuf};
use tracing::warn;

/// A validated upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub org: String,
    pub repo: String,
    pub target: String,
    pub channel: String,
    pub file: PathBuf,
}

impl UploadRequest {
    /// Validate upload inputs
    ///
    /// `repository` must be `org/repo`. The file must exist; a name without a
    /// package extension is only a warning.
    pub fn new(
        file: impl Into<PathBuf>,
        target: &str,
        repository: &str,
        channel: &str,
    ) -> PkgflowResult<Self> {
        let (org, repo) = split_repository(repository)?;
        let target = required("target", target)?;
        let channel = required("channel", channel)?;

        let file = file.into();
        if file.as_os_str().is_empty() {
            return Err(PkgflowError::MissingInput("file"));
        }
        if !file.is_file() {
            return Err(PkgflowError::FileNotFound(file));
        }

        let name = file_name(&file);
        if ArtifactKind::from_file_name(&name).is_none() {
            warn!(
                "File {} doesn't appear to be a package file (.deb or .rpm)",
                name
            );
        }

        Ok(Self {
            org,
            repo,
            target,
            channel,
            file,
        })
    }

    /// File name sent in the multipart `file` field
    pub fn file_name(&self) -> String {
        file_name(&self.file)
    }

    /// `org/repo`
    pub fn repository(&self) -> String {
        format!("{}/{}", self.org, self.repo)
    }
}

/// Split `org/repo` on its single `/`
pub fn split_repository(repository: &str) -> PkgflowResult<(String, String)> {
    let invalid = || PkgflowError::InvalidRepository(repository.to_string());

    let (org, repo) = repository.split_once('/').ok_or_else(invalid)?;
    if org.trim().is_empty() || repo.trim().is_empty() || repo.contains('/') {
        return Err(invalid());
    }
    Ok((org.to_string(), repo.to_string()))
}

fn required(name: &'static str, value: &str) -> PkgflowResult<String> {
    if value.trim().is_empty() {
        return Err(PkgflowError::MissingInput(name));
    }
    Ok(value.to_string())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
