//! Package command - build a .deb/.rpm with the packaging container

use crate::cache::{self, CacheRestore, CacheStore, LocalCacheStore};
use crate::cli::args::PackageArgs;
use crate::config::Config;
use crate::error::{PkgflowError, PkgflowResult};
use crate::orchestration::{self, ContainerBuilder, PackageJob, PackageReport, PackageSpec};
use crate::outputs::Outputs;
use crate::ui::{self, BuildProgress, UiContext};
use std::sync::Arc;
use tracing::debug;

/// Execute the package command
pub async fn execute(args: PackageArgs, config: &Config) -> PkgflowResult<()> {
    let ctx = UiContext::detect();
    ui::intro(&ctx, &format!("pkgflow package {}", args.name));

    let job = job_from_args(&args, config)?;

    let mut build_config = config.build.clone();
    if let Some(runtime) = args.runtime.clone() {
        build_config.runtime = runtime;
    }

    let progress = Arc::new(BuildProgress::new(&ctx, &args.name));
    let sink = Arc::clone(&progress);
    let builder = ContainerBuilder::new(build_config).with_output(Arc::new(move |line: &str| {
        debug!("{}", line);
        sink.on_line(line);
    }));

    let store = (config.cache.enabled && !args.no_cache)
        .then(|| LocalCacheStore::new(config.cache.store_dir()));
    let cache = store.as_ref().map(|s| s as &dyn CacheStore);

    let result = orchestration::package(&job, &builder, cache).await;
    progress.finish();
    let report = result?;

    summarize(&ctx, &report);
    outputs(&report)?.emit(args.output_file.as_ref()).await?;

    ui::outro_success(&ctx, &format!("Built {}", report.artifact.name));
    Ok(())
}

fn job_from_args(args: &PackageArgs, config: &Config) -> PkgflowResult<PackageJob> {
    for (name, value) in [
        ("target", &args.target),
        ("name", &args.name),
        ("version", &args.version),
        ("pkgr_version", &args.pkgr_version),
    ] {
        if value.trim().is_empty() {
            return Err(PkgflowError::MissingInput(name));
        }
    }

    if !args.path.is_dir() {
        return Err(PkgflowError::FileNotFound(args.path.clone()));
    }
    let app_dir = std::fs::canonicalize(&args.path)
        .map_err(|e| PkgflowError::io(format!("resolving {}", args.path.display()), e))?;

    let prefix = args
        .cache_prefix
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or(&config.cache.prefix);

    Ok(PackageJob {
        target: args.target.trim().to_string(),
        spec: PackageSpec {
            name: args.name.clone(),
            version: args.version.clone(),
            app_dir,
            tool_version: args.pkgr_version.clone(),
            env: args.env.clone(),
            debug: args.debug,
        },
        workspace_root: args
            .workspace
            .clone()
            .unwrap_or_else(|| config.build.workspace.clone()),
        namespace: cache::namespace(prefix),
        revision: args.revision.clone(),
    })
}

fn summarize(ctx: &UiContext, report: &PackageReport) {
    match &report.restored {
        CacheRestore::Exact => ui::step_ok(ctx, "Cache restored"),
        CacheRestore::Partial(key) => ui::step_ok(ctx, &format!("Cache restored from {}", key)),
        CacheRestore::Miss => ui::step_info(ctx, "No cache restored"),
    }

    let artifact = &report.artifact;
    ui::step_ok(
        ctx,
        &format!("Package created: {} ({})", artifact.name, artifact.kind),
    );
    ui::key_value(ctx, "Iteration", &report.identity.iteration);
    ui::key_value(ctx, "Size", &format!("{:.2} MB", artifact.size_mib()));
    ui::key_value(ctx, "Cache key", &report.cache_key.primary);
}

fn outputs(report: &PackageReport) -> PkgflowResult<Outputs> {
    let artifact = &report.artifact;
    let mut outputs = Outputs::new();
    outputs.set("workspace", report.workspace.root().display());
    outputs.set("iteration", &report.identity.iteration);
    outputs.set("package_path", artifact.path.display());
    outputs.set("package_type", artifact.kind);
    outputs.set("package_name", &artifact.name);
    outputs.set("package_size", artifact.size_bytes);
    outputs.set("package_sha256", artifact.sha256()?);
    Ok(outputs)
}
