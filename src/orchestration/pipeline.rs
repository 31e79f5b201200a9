//! Package pipeline
//!
//! identity → workspace → cache restore → build → locate artifact → cache save.
//! Cache failures are logged and never fail the build.

use crate::artifact::{locate_artifact, Artifact};
use crate::cache::{CacheKey, CacheRestore, CacheStore};
use crate::error::PkgflowResult;
use crate::identity::{head_revision, BuildIdentity};
use crate::orchestration::builder::{Builder, PackageSpec};
use crate::orchestration::workspace::Workspace;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Inputs for one `package` run
#[derive(Debug, Clone)]
pub struct PackageJob {
    /// Raw target, e.g. `ubuntu-22.04`
    pub target: String,
    pub spec: PackageSpec,
    /// Workspace root, emptied before the build
    pub workspace_root: PathBuf,
    /// Cache namespace (`pkgr-<prefix>`)
    pub namespace: String,
    /// Explicit cache discriminator, usually the CI commit sha
    pub revision: Option<String>,
}

/// What a successful run produced
#[derive(Debug, Clone)]
pub struct PackageReport {
    pub identity: BuildIdentity,
    pub workspace: Workspace,
    pub cache_key: CacheKey,
    pub restored: CacheRestore,
    pub artifact: Artifact,
}

/// Build the package described by `job`.
pub async fn package(
    job: &PackageJob,
    builder: &dyn Builder,
    cache: Option<&dyn CacheStore>,
) -> PkgflowResult<PackageReport> {
    let identity = BuildIdentity::derive(&job.target, &job.spec.app_dir).await;
    info!("Target: {}", identity.target);
    info!("Iteration: {}", identity.iteration);

    let workspace = Workspace::prepare(&job.workspace_root).await?;

    let discriminator = discriminator(job, &identity).await;
    let cache_key = CacheKey::derive(
        &job.namespace,
        &identity.target,
        &job.spec.tool_version,
        &discriminator,
    );
    debug!("Cache key: {}", cache_key);

    let paths = workspace.cache_paths();
    let restored = match cache {
        Some(store) => restore(store, &paths, &cache_key).await,
        None => CacheRestore::Miss,
    };

    info!("Building with {}", builder.builder_name());
    builder
        .build(&identity, &job.spec, &workspace)
        .await?
        .into_result()?;

    let artifact = locate_artifact(&workspace.output_dir)?;
    info!(
        "Package built: {} ({:.2} MB)",
        artifact.name,
        artifact.size_mib()
    );

    if let Some(store) = cache {
        if let Err(e) = store.save(&paths, &cache_key.primary).await {
            warn!("Failed to save cache {}: {}", cache_key.primary, e);
        }
    }

    Ok(PackageReport {
        identity,
        workspace,
        cache_key,
        restored,
        artifact,
    })
}

/// Per-run cache discriminator: explicit revision, then full HEAD, then timestamp
async fn discriminator(job: &PackageJob, identity: &BuildIdentity) -> String {
    if let Some(revision) = job.revision.as_deref().map(str::trim) {
        if !revision.is_empty() {
            return revision.to_string();
        }
    }
    match head_revision(&job.spec.app_dir).await {
        Ok(revision) => revision,
        Err(_) => identity.timestamp.to_string(),
    }
}

async fn restore(store: &dyn CacheStore, paths: &[PathBuf], key: &CacheKey) -> CacheRestore {
    match store.restore(paths, &key.primary, &key.fallbacks).await {
        Ok(CacheRestore::Exact) => {
            info!("Cache restored from {}", key.primary);
            CacheRestore::Exact
        }
        Ok(CacheRestore::Partial(matched)) => {
            info!("Cache restored from {}", matched);
            CacheRestore::Partial(matched)
        }
        Ok(CacheRestore::Miss) => {
            info!("No cache found for {}", key.primary);
            CacheRestore::Miss
        }
        Err(e) => {
            warn!("Failed to restore cache: {}", e);
            CacheRestore::Miss
        }
    }
}
