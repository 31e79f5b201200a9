//! pkgflow - build and publish Linux packages
//!
//! CLI entry point that dispatches to subcommands.

use clap::{CommandFactory, Parser};
use console::style;
use pkgflow::cli::{Cli, Commands};
use pkgflow::config::{Config, ConfigManager};
use pkgflow::error::PkgflowResult;
use pkgflow::secrets::SecretMask;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let mask = SecretMask::new();
    match run(&mask).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{} {}",
                style("Error:").red().bold(),
                mask.redact(&e.to_string())
            );
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            } else if e.is_retryable() {
                eprintln!(
                    "{} The repository service may be unavailable; re-running may succeed",
                    style("Hint:").yellow()
                );
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(mask: &SecretMask) -> PkgflowResult<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "pkgflow", &mut std::io::stdout());
        return Ok(());
    }

    // Secrets are registered before anything can log them
    if let Commands::Publish(ref args) = cli.command {
        mask.register(args.token.as_str());
    }

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    init_logging(cli.verbose, &config, mask);

    match cli.command {
        Commands::Completions { .. } => Ok(()),
        Commands::Package(args) => pkgflow::cli::commands::package(args, &config).await,
        Commands::Publish(args) => pkgflow::cli::commands::publish(args, &config, mask).await,
        Commands::Config(args) => {
            pkgflow::cli::commands::config(args, &config, &config_manager).await
        }
    }
}

/// 0 = warn (spinners only), 1 = info, 2+ = debug. `general.verbose` counts as one `-v`.
fn init_logging(verbose: u8, config: &Config, mask: &SecretMask) {
    let level = verbose.max(u8::from(config.general.verbose));
    let filter = match level {
        0 => EnvFilter::new("pkgflow=warn"),
        1 => EnvFilter::new("pkgflow=info"),
        _ => EnvFilter::new("pkgflow=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(mask.stderr_writer())
        .with_target(false);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
