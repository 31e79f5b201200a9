//! Packaging step abstraction
//!
//! The packaging tool is a black box: it receives the application source,
//! the cache directory and the output directory, and exits with a status.

use crate::error::{PkgflowError, PkgflowResult};
use crate::identity::BuildIdentity;
use crate::orchestration::workspace::Workspace;
use async_trait::async_trait;
use std::path::PathBuf;

/// What to package
#[derive(Debug, Clone)]
pub struct PackageSpec {
    /// Package name
    pub name: String,
    /// Package version
    pub version: String,
    /// Application source directory, bind-mounted at `/pkgr/app`
    pub app_dir: PathBuf,
    /// Packaging tool version, selects the build image
    pub tool_version: String,
    /// Free-form environment passed through `--env`
    pub env: String,
    /// Passed through as `--debug=<bool>`
    pub debug: bool,
}

/// Exit status and output of a packaging run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStatus {
    /// Exit code, `None` when the process was killed by a signal
    pub code: Option<i32>,
    /// Combined tool output, in arrival order
    pub output: String,
}

impl BuildStatus {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turn a failed status into an error carrying the tool's own output
    pub fn into_result(self) -> PkgflowResult<()> {
        match self.code {
            Some(0) => Ok(()),
            Some(code) => Err(PkgflowError::BuildFailed {
                code,
                output: self.output,
            }),
            None => Err(PkgflowError::BuildSignaled),
        }
    }
}

/// Runs the packaging tool for one build
///
/// Failures are deterministic (bad input), so callers never retry.
#[async_trait]
pub trait Builder: Send + Sync {
    /// Package `spec` into `workspace.output_dir` and report the tool's exit status
    async fn build(
        &self,
        identity: &BuildIdentity,
        spec: &PackageSpec,
        workspace: &Workspace,
    ) -> PkgflowResult<BuildStatus>;

    /// Human-readable name for display
    fn builder_name(&self) -> &'static str;
}
