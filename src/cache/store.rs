//! Cache store adapter
//!
//! The build only needs a key→blob store with restore/save. `LocalCacheStore`
//! keeps one tar archive per key in a directory on the host.

use crate::error::{PkgflowError, PkgflowResult};
use async_trait::async_trait;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;
use uuid::Uuid;

/// Result of a cache restore
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheRestore {
    /// The primary key was found
    Exact,
    /// A fallback prefix matched the given key
    Partial(String),
    /// Nothing matched
    Miss,
}

impl CacheRestore {
    pub fn is_hit(&self) -> bool {
        !matches!(self, Self::Miss)
    }
}

/// Key→blob store used to carry the build cache directory across runs
///
/// Implementations must tolerate concurrent restore/save from other
/// invocations sharing the same store.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Restore `paths` from `key`, or from the newest entry matching one of
    /// `fallbacks` (tried in order) as a prefix.
    async fn restore(
        &self,
        paths: &[PathBuf],
        key: &str,
        fallbacks: &[String],
    ) -> PkgflowResult<CacheRestore>;

    /// Save `paths` under `key`.
    async fn save(&self, paths: &[PathBuf], key: &str) -> PkgflowResult<()>;
}

/// Cache store backed by tar archives in a local directory
pub struct LocalCacheStore {
    root: PathBuf,
}

impl LocalCacheStore {
    /// Create a store rooted at `root` (created lazily on first save)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn archive_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.tar", encode_key(key)))
    }

    /// Newest archive whose key starts with `prefix`
    fn newest_with_prefix(&self, prefix: &str) -> io::Result<Option<(String, PathBuf)>> {
        let encoded_prefix = encode_key(prefix);
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let mut newest: Option<(SystemTime, String, PathBuf)> = None;
        for entry in entries {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            let Some(encoded) = name.strip_suffix(".tar") else {
                continue;
            };
            if name.starts_with('.') || !encoded.starts_with(&encoded_prefix) {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            if newest.as_ref().map_or(true, |(t, _, _)| modified > *t) {
                newest = Some((modified, decode_key(encoded), entry.path()));
            }
        }

        Ok(newest.map(|(_, key, path)| (key, path)))
    }
}

#[async_trait]
impl CacheStore for LocalCacheStore {
    async fn restore(
        &self,
        paths: &[PathBuf],
        key: &str,
        fallbacks: &[String],
    ) -> PkgflowResult<CacheRestore> {
        let exact = self.archive_path(key);
        let (archive, outcome) = if exact.is_file() {
            (exact, CacheRestore::Exact)
        } else {
            let mut found = None;
            for prefix in fallbacks {
                if let Some((matched, path)) = self
                    .newest_with_prefix(prefix)
                    .map_err(|e| PkgflowError::cache(key, e.to_string()))?
                {
                    found = Some((path, CacheRestore::Partial(matched)));
                    break;
                }
            }
            match found {
                Some(found) => found,
                None => return Ok(CacheRestore::Miss),
            }
        };

        debug!("Unpacking cache archive {}", archive.display());
        let paths = paths.to_vec();
        tokio::task::spawn_blocking(move || unpack_archive(&archive, &paths))
            .await
            .map_err(|e| PkgflowError::Internal(format!("cache restore task: {}", e)))?
            .map_err(|e| PkgflowError::cache(key, e.to_string()))?;

        Ok(outcome)
    }

    async fn save(&self, paths: &[PathBuf], key: &str) -> PkgflowResult<()> {
        let root = self.root.clone();
        let archive = self.archive_path(key);
        let tmp = root.join(format!(".{}.{}.tmp", encode_key(key), Uuid::new_v4()));
        let paths = paths.to_vec();

        tokio::task::spawn_blocking(move || {
            let result = pack_archive(&root, &tmp, &paths).and_then(|()| fs::rename(&tmp, &archive));
            if result.is_err() {
                let _ = fs::remove_file(&tmp);
            }
            result
        })
        .await
        .map_err(|e| PkgflowError::Internal(format!("cache save task: {}", e)))?
        .map_err(|e| PkgflowError::cache(key, e.to_string()))
    }
}

/// Escape characters that cannot appear in a file name. Per-character, so
/// key prefixes stay prefixes after encoding.
fn encode_key(key: &str) -> String {
    key.replace('%', "%25").replace('/', "%2F")
}

fn decode_key(encoded: &str) -> String {
    encoded.replace("%2F", "/").replace("%25", "%")
}

/// Archive each path under a member directory named after its index
fn pack_archive(root: &Path, tmp: &Path, paths: &[PathBuf]) -> io::Result<()> {
    fs::create_dir_all(root)?;
    let file = File::create(tmp)?;
    let mut builder = tar::Builder::new(file);
    for (idx, path) in paths.iter().enumerate() {
        if path.is_dir() {
            builder.append_dir_all(idx.to_string(), path)?;
        }
    }
    builder.into_inner()?.sync_all()
}

/// Unpack members back into `paths`. Link members are skipped (archives are
/// written with links dereferenced) and every write must resolve inside its
/// destination root.
fn unpack_archive(archive: &Path, paths: &[PathBuf]) -> io::Result<()> {
    let mut archive = tar::Archive::new(File::open(archive)?);
    for entry in archive.entries()? {
        let mut entry = entry?;
        let member = entry.path()?.into_owned();
        let entry_type = entry.header().entry_type();
        if entry_type.is_symlink() || entry_type.is_hard_link() {
            debug!("Skipping link member {}", member.display());
            continue;
        }

        let mut components = member.components();
        let Some(Component::Normal(first)) = components.next() else {
            continue;
        };
        let Some(dest_root) = first
            .to_str()
            .and_then(|s| s.parse::<usize>().ok())
            .and_then(|idx| paths.get(idx))
        else {
            continue;
        };
        let rest = components.as_path();
        if rest.components().any(|c| !matches!(c, Component::Normal(_))) {
            continue;
        }
        if rest.as_os_str().is_empty() {
            fs::create_dir_all(dest_root)?;
            continue;
        }

        let dest = dest_root.join(rest);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
            ensure_inside(dest_root, parent)?;
        }
        entry.unpack(&dest)?;
    }
    Ok(())
}

fn ensure_inside(root: &Path, dir: &Path) -> io::Result<()> {
    let root = root.canonicalize()?;
    if dir.canonicalize()?.starts_with(&root) {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{} resolves outside {}", dir.display(), root.display()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn populated_cache(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let cache = dir.path().join(name);
        fs::create_dir_all(cache.join("deps")).unwrap();
        fs::write(cache.join("deps/lib.txt"), contents).unwrap();
        cache
    }

    #[test]
    fn key_encoding_preserves_prefixes() {
        let key = "pkgr-v1-ubuntu/20.04-1.0-abc";
        let prefix = "pkgr-v1-ubuntu/20.04-1.0-";
        assert!(encode_key(key).starts_with(&encode_key(prefix)));
        assert!(!encode_key(key).contains('/'));
        assert_eq!(decode_key(&encode_key("a%2F/b")), "a%2F/b");
    }

    #[tokio::test]
    async fn restore_miss_on_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = LocalCacheStore::new(dir.path().join("store"));
        let target = dir.path().join("cache");

        let outcome = store
            .restore(&[target], "k-1", &["k-".to_string()])
            .await
            .unwrap();
        assert_eq!(outcome, CacheRestore::Miss);
        assert!(!outcome.is_hit());
    }

    #[tokio::test]
    async fn save_then_exact_restore() {
        let dir = TempDir::new().unwrap();
        let store = LocalCacheStore::new(dir.path().join("store"));
        let source = populated_cache(&dir, "cache", "v1");

        store.save(&[source], "pkgr-x-ubuntu/20-1.0-aaa").await.unwrap();

        let target = dir.path().join("restored");
        let outcome = store
            .restore(&[target.clone()], "pkgr-x-ubuntu/20-1.0-aaa", &[])
            .await
            .unwrap();

        assert_eq!(outcome, CacheRestore::Exact);
        assert_eq!(fs::read_to_string(target.join("deps/lib.txt")).unwrap(), "v1");
    }

    #[tokio::test]
    async fn fallback_prefix_restores_partial() {
        let dir = TempDir::new().unwrap();
        let store = LocalCacheStore::new(dir.path().join("store"));
        let source = populated_cache(&dir, "cache", "older");

        store.save(&[source], "pkgr-x-el/9-1.0-aaa").await.unwrap();

        let target = dir.path().join("restored");
        let outcome = store
            .restore(
                &[target.clone()],
                "pkgr-x-el/9-1.0-bbb",
                &["pkgr-x-el/9-1.0-".to_string()],
            )
            .await
            .unwrap();

        assert_eq!(outcome, CacheRestore::Partial("pkgr-x-el/9-1.0-aaa".to_string()));
        assert_eq!(
            fs::read_to_string(target.join("deps/lib.txt")).unwrap(),
            "older"
        );
    }

    #[tokio::test]
    async fn fallback_ignores_other_targets() {
        let dir = TempDir::new().unwrap();
        let store = LocalCacheStore::new(dir.path().join("store"));
        let source = populated_cache(&dir, "cache", "debian");

        store.save(&[source], "pkgr-x-debian/12-1.0-aaa").await.unwrap();

        let outcome = store
            .restore(
                &[dir.path().join("restored")],
                "pkgr-x-el/9-1.0-bbb",
                &["pkgr-x-el/9-1.0-".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(outcome, CacheRestore::Miss);
    }

    #[tokio::test]
    async fn save_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let store = LocalCacheStore::new(dir.path().join("store"));
        let source = populated_cache(&dir, "cache", "x");

        store.save(&[source.clone()], "k-1").await.unwrap();
        store.save(&[source], "k-1").await.unwrap();

        let names: Vec<String> = fs::read_dir(store.root())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["k-1.tar".to_string()]);
    }

    /// Writes a raw archive for `key` into the store directory
    fn write_archive(
        store: &LocalCacheStore,
        key: &str,
        build: impl FnOnce(&mut tar::Builder<File>),
    ) {
        fs::create_dir_all(store.root()).unwrap();
        let file = File::create(store.archive_path(key)).unwrap();
        let mut builder = tar::Builder::new(file);
        build(&mut builder);
        builder.finish().unwrap();
    }

    fn file_member(builder: &mut tar::Builder<File>, path: &str, data: &[u8]) {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        builder.append_data(&mut header, path, data).unwrap();
    }

    #[tokio::test]
    async fn link_members_cannot_redirect_writes() {
        let dir = TempDir::new().unwrap();
        let outside = dir.path().join("outside");
        fs::create_dir_all(&outside).unwrap();
        let store = LocalCacheStore::new(dir.path().join("store"));

        write_archive(&store, "k-1", |builder| {
            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Symlink);
            header.set_size(0);
            header.set_mode(0o777);
            builder.append_link(&mut header, "0/link", &outside).unwrap();
            file_member(builder, "0/link/x", b"evil");
            file_member(builder, "0/deps/lib.txt", b"ok");
        });

        let target = dir.path().join("cache");
        let outcome = store.restore(&[target.clone()], "k-1", &[]).await.unwrap();

        assert_eq!(outcome, CacheRestore::Exact);
        assert!(!outside.join("x").exists());
        assert_eq!(fs::read_to_string(target.join("deps/lib.txt")).unwrap(), "ok");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn existing_symlink_in_target_is_not_followed() {
        let dir = TempDir::new().unwrap();
        let outside = dir.path().join("outside");
        fs::create_dir_all(&outside).unwrap();
        let target = dir.path().join("cache");
        fs::create_dir_all(&target).unwrap();
        std::os::unix::fs::symlink(&outside, target.join("link")).unwrap();

        let store = LocalCacheStore::new(dir.path().join("store"));
        write_archive(&store, "k-1", |builder| file_member(builder, "0/link/x", b"evil"));

        let result = store.restore(&[target], "k-1", &[]).await;

        assert!(matches!(result, Err(PkgflowError::CacheStore { .. })));
        assert!(!outside.join("x").exists());
    }
}
