//! Containerized packaging tool
//!
//! Runs the packaging image with docker (or podman) and bind mounts for the
//! application source, cache and output directories.

use crate::config::schema::BuildConfig;
use crate::error::{PkgflowError, PkgflowResult};
use crate::identity::BuildIdentity;
use crate::orchestration::builder::{BuildStatus, Builder, PackageSpec};
use crate::orchestration::stream_child_output;
use crate::orchestration::workspace::Workspace;
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info};

/// Mount points inside the packaging image
const APP_MOUNT: &str = "/pkgr/app";
const CACHE_MOUNT: &str = "/pkgr/cache";
const OUTPUT_MOUNT: &str = "/pkgr/output";

/// Callback for each line the packaging tool prints
pub type OutputSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Builder that runs the packaging image in a container
pub struct ContainerBuilder {
    config: BuildConfig,
    on_output: OutputSink,
}

impl ContainerBuilder {
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            on_output: Arc::new(|line: &str| debug!("{}", line)),
        }
    }

    /// Forward each output line to `sink` (in addition to collecting it)
    pub fn with_output(mut self, sink: OutputSink) -> Self {
        self.on_output = sink;
        self
    }

    /// Image for a target: `<registry>/<target>-<tool version>`
    pub fn image(&self, identity: &BuildIdentity, spec: &PackageSpec) -> String {
        format!(
            "{}/{}-{}",
            self.config.image_registry.trim_end_matches('/'),
            identity.target,
            spec.tool_version
        )
    }

    /// Full argument list passed to the container runtime
    pub fn run_args(
        &self,
        identity: &BuildIdentity,
        spec: &PackageSpec,
        workspace: &Workspace,
    ) -> Vec<String> {
        let mut args = vec!["run".to_string(), "--rm".to_string()];

        // Volumes
        for (host, container) in [
            (&spec.app_dir, APP_MOUNT),
            (&workspace.cache_dir, CACHE_MOUNT),
            (&workspace.output_dir, OUTPUT_MOUNT),
        ] {
            args.push("-v".to_string());
            args.push(format!("{}:{}", host.display(), container));
        }

        // Network
        args.push(format!("--net={}", self.config.network));

        // Image
        args.push(self.image(identity, spec));

        // Packaging tool arguments
        args.extend([
            "--name".to_string(),
            spec.name.clone(),
            "--version".to_string(),
            spec.version.clone(),
            "--iteration".to_string(),
            identity.iteration.clone(),
            "--env".to_string(),
            spec.env.clone(),
            format!("--debug={}", spec.debug),
        ]);

        args
    }
}

#[async_trait]
impl Builder for ContainerBuilder {
    async fn build(
        &self,
        identity: &BuildIdentity,
        spec: &PackageSpec,
        workspace: &Workspace,
    ) -> PkgflowResult<BuildStatus> {
        let args = self.run_args(identity, spec, workspace);
        let command = format!("{} run", self.config.runtime);

        info!(
            "Packaging {} version {} for {}",
            spec.name, spec.version, identity.target
        );
        debug!("Executing: {} {:?}", self.config.runtime, args);

        let mut child = Command::new(&self.config.runtime)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PkgflowError::command_failed(command.clone(), e))?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(PkgflowError::Internal(format!(
                "{}: output pipes not captured",
                command
            )));
        };

        let lines = stream_child_output(stdout, stderr, self.on_output.as_ref()).await;

        let status = child
            .wait()
            .await
            .map_err(|e| PkgflowError::command_failed(command, e))?;

        Ok(BuildStatus {
            code: status.code(),
            output: lines.join("\n"),
        })
    }

    fn builder_name(&self) -> &'static str {
        "container"
    }
}
