//! Cache key derivation
//!
//! The primary key pins an exact build (same target, tool version and
//! revision). The fallback prefix lets a different revision of the same
//! target reuse whatever the previous build left in the cache directory.

use std::fmt;

/// Primary cache key plus its ordered restore fallbacks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    /// Exact key, saved after a successful build
    pub primary: String,
    /// Prefix keys, most specific first, tried when the primary misses
    pub fallbacks: Vec<String>,
}

impl CacheKey {
    /// Derive the key for `(namespace, target, tool_version, discriminator)`.
    pub fn derive(namespace: &str, target: &str, tool_version: &str, discriminator: &str) -> Self {
        let prefix = format!("{}-{}-{}-", namespace, target, tool_version);
        Self {
            primary: format!("{}{}", prefix, discriminator),
            fallbacks: vec![prefix],
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.primary)
    }
}

/// Namespace used for cache keys: `pkgr-<prefix>`
pub fn namespace(cache_prefix: &str) -> String {
    format!("pkgr-{}", cache_prefix)
}
