//! Configuration schema for pkgflow
//!
//! Configuration is stored at `~/.config/pkgflow/config.toml`

use crate::upload::DEFAULT_SERVER_URL;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Packaging container settings
    pub build: BuildConfig,

    /// Build cache settings
    pub cache: CacheConfig,

    /// Upload settings
    pub upload: UploadConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
        }
    }
}

/// Packaging container settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Container runtime binary (docker or podman)
    pub runtime: String,

    /// Registry prefix of the packaging images
    pub image_registry: String,

    /// Network mode for the packaging container
    pub network: String,

    /// Workspace root, wiped at the start of every build
    pub workspace: PathBuf,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            runtime: "docker".to_string(),
            image_registry: "ghcr.io/pkgr/pkgr".to_string(),
            network: "host".to_string(),
            workspace: PathBuf::from("/tmp/pkgr"),
        }
    }
}

/// Build cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Restore and save the build cache (default: true)
    pub enabled: bool,

    /// Cache key prefix when none is passed on the command line
    pub prefix: String,

    /// Where archives are kept (default: platform cache dir)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prefix: "default".to_string(),
            store_dir: None,
        }
    }
}

impl CacheConfig {
    /// Configured store directory, or `<cache dir>/pkgflow`
    pub fn store_dir(&self) -> PathBuf {
        self.store_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("pkgflow")
        })
    }
}

/// Upload settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Repository service base URL
    pub url: String,

    /// Total upload attempts
    pub max_attempts: u32,

    /// Delay after the first failed attempt; doubles each retry
    pub base_delay_secs: u64,

    /// Hard limit for one attempt
    pub attempt_timeout_secs: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SERVER_URL.to_string(),
            max_attempts: 3,
            base_delay_secs: 1,
            attempt_timeout_secs: 10 * 60,
        }
    }
}
