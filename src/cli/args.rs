//! CLI argument definitions using clap derive
//!
//! Build and publish inputs can also come from the environment, using the
//! names a GitHub Actions step exports (`INPUT_<NAME>`).

use clap::{ArgAction, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// pkgflow - build and publish .deb/.rpm packages
///
/// Runs the containerized packaging tool with a persistent build cache and
/// uploads the result to a package repository.
#[derive(Parser, Debug)]
#[command(name = "pkgflow")]
#[command(author, version, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "PKGFLOW_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a package for one target
    Package(PackageArgs),

    /// Upload a package to the repository service
    Publish(PublishArgs),

    /// Show or edit configuration
    Config(ConfigArgs),

    /// Print shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

/// Arguments for the package command
#[derive(Parser, Debug)]
pub struct PackageArgs {
    /// Target distribution, e.g. ubuntu-22.04 or debian:12
    #[arg(long, env = "INPUT_TARGET")]
    pub target: String,

    /// Package name
    #[arg(long, env = "INPUT_NAME")]
    pub name: String,

    /// Application source directory
    #[arg(long, env = "INPUT_PATH", default_value = ".")]
    pub path: PathBuf,

    /// Package version
    #[arg(id = "pkg_version", long = "pkg-version", env = "INPUT_VERSION")]
    pub version: String,

    /// Packaging tool version (selects the build image)
    #[arg(long, env = "INPUT_PKGR_VERSION")]
    pub pkgr_version: String,

    /// Cache key prefix (default: from config)
    #[arg(long, env = "INPUT_CACHE_PREFIX")]
    pub cache_prefix: Option<String>,

    /// Environment passed to the packaging tool
    #[arg(long, env = "INPUT_ENV", default_value = "")]
    pub env: String,

    /// Run the packaging tool in debug mode
    #[arg(long, env = "INPUT_DEBUG", action = ArgAction::Set, default_value_t = false)]
    pub debug: bool,

    /// Cache discriminator (default: git HEAD of the source directory)
    #[arg(long, env = "GITHUB_SHA")]
    pub revision: Option<String>,

    /// Workspace root (default: from config)
    #[arg(long)]
    pub workspace: Option<PathBuf>,

    /// Container runtime binary (default: from config)
    #[arg(long)]
    pub runtime: Option<String>,

    /// Skip cache restore and save
    #[arg(long)]
    pub no_cache: bool,

    /// Append outputs to this file
    #[arg(long, env = "GITHUB_OUTPUT")]
    pub output_file: Option<PathBuf>,
}

/// Arguments for the publish command
#[derive(Parser, Debug)]
pub struct PublishArgs {
    /// Package file to upload
    #[arg(long, env = "INPUT_FILE")]
    pub file: PathBuf,

    /// Target distribution the package was built for
    #[arg(long, env = "INPUT_TARGET")]
    pub target: String,

    /// Destination repository as <org>/<repo>
    #[arg(long, env = "INPUT_REPOSITORY")]
    pub repository: String,

    /// Repository channel, e.g. main or unstable
    #[arg(long, env = "INPUT_CHANNEL")]
    pub channel: String,

    /// API token
    #[arg(long, env = "INPUT_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Repository service URL (default: from config)
    #[arg(long, env = "INPUT_URL")]
    pub url: Option<String>,

    /// Total upload attempts (default: from config)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_attempts: Option<u32>,

    /// Append outputs to this file
    #[arg(long, env = "GITHUB_OUTPUT")]
    pub output_file: Option<PathBuf>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., upload.url)
        key: String,
        /// Value to set
        value: String,
    },
}
