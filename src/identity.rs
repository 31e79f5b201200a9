//! Build identity derivation
//!
//! Normalizes the target platform string and computes the package
//! iteration: `<unix seconds>[.<revision>].<codename>`.

use chrono::Utc;
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Length of the short source revision embedded in the iteration
pub const REVISION_FRAGMENT_LEN: usize = 7;

/// Normalize a target such as `ubuntu-20`, `ubuntu:20` or `ubuntu/20`
/// into `family/version` form.
///
/// Only the first `-` and the first `:` are replaced. Extra separators are
/// kept as-is (`ubuntu-20-04` becomes `ubuntu/20-04`).
pub fn normalize_target(raw: &str) -> String {
    raw.replacen('-', "/", 1).replacen(':', "/", 1)
}

/// Derive the platform codename from a normalized target.
///
/// All `:` are stripped, everything from the first `.` on is dropped, and
/// the family segment before the first `/` is kept (`ubuntu/20.04` gives
/// `ubuntu`).
pub fn codename(canonical_target: &str) -> String {
    let stripped: String = canonical_target.chars().filter(|c| *c != ':').collect();
    let head = stripped.split('.').next().unwrap_or_default();
    head.split('/').next().unwrap_or_default().to_string()
}

/// A short source-control revision (always `REVISION_FRAGMENT_LEN` chars)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionFragment(String);

impl RevisionFragment {
    /// Build a fragment from a full revision. Returns `None` when the
    /// revision is shorter than a fragment.
    pub fn from_revision(revision: &str) -> Option<Self> {
        let trimmed = revision.trim();
        let fragment: String = trimmed.chars().take(REVISION_FRAGMENT_LEN).collect();
        (fragment.chars().count() == REVISION_FRAGMENT_LEN).then_some(Self(fragment))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RevisionFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why no revision fragment is available. Never a build failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionAbsent {
    /// `git` could not be spawned
    ToolUnavailable(String),
    /// `git` ran but the path is not a repository (or has no commits)
    NotARepository,
    /// `git` printed something too short to use
    Unusable(String),
}

impl fmt::Display for RevisionAbsent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToolUnavailable(reason) => write!(f, "git unavailable: {}", reason),
            Self::NotARepository => write!(f, "not a git repository"),
            Self::Unusable(out) => write!(f, "unusable revision output: {:?}", out),
        }
    }
}

/// Read the full HEAD revision of the repository at `path`.
pub async fn head_revision(path: &Path) -> Result<String, RevisionAbsent> {
    let output = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .await
        .map_err(|e| RevisionAbsent::ToolUnavailable(e.to_string()))?;

    if !output.status.success() {
        return Err(RevisionAbsent::NotARepository);
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Look up the short revision of the source tree at `path`.
pub async fn lookup_revision(path: &Path) -> Result<RevisionFragment, RevisionAbsent> {
    let revision = head_revision(path).await?;
    RevisionFragment::from_revision(&revision).ok_or(RevisionAbsent::Unusable(revision))
}

/// Identity of a single build invocation
#[derive(Debug, Clone)]
pub struct BuildIdentity {
    /// Unix timestamp (seconds) taken at derivation time
    pub timestamp: i64,
    /// Normalized `family/version` target
    pub target: String,
    /// Short source revision, if one could be read
    pub revision: Result<RevisionFragment, RevisionAbsent>,
    /// Platform codename derived from the target
    pub codename: String,
    /// Package iteration passed to the packaging tool
    pub iteration: String,
}

impl BuildIdentity {
    /// Derive the identity for a build of the source tree at `source_path`.
    pub async fn derive(raw_target: &str, source_path: &Path) -> Self {
        let revision = lookup_revision(source_path).await;
        if let Err(ref reason) = revision {
            debug!("Could not get git hash: {}", reason);
        }
        Self::from_parts(Utc::now().timestamp(), revision, raw_target)
    }

    /// Assemble an identity from already-known parts.
    pub fn from_parts(
        timestamp: i64,
        revision: Result<RevisionFragment, RevisionAbsent>,
        raw_target: &str,
    ) -> Self {
        let target = normalize_target(raw_target);
        let codename = codename(&target);

        let mut components = vec![timestamp.to_string()];
        if let Ok(ref fragment) = revision {
            components.push(fragment.to_string());
        }
        components.push(codename.clone());
        let iteration = components
            .into_iter()
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(".");

        Self {
            timestamp,
            target,
            revision,
            codename,
            iteration,
        }
    }

    /// The short revision, if present
    pub fn revision_fragment(&self) -> Option<&RevisionFragment> {
        self.revision.as_ref().ok()
    }
}
