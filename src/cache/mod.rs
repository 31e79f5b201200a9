//! Build cache keyed by target, tool version and revision
//!
//! The packaging tool writes downloaded dependencies and intermediate state
//! into the workspace cache directory. That directory is restored before the
//! build and saved after it.
//!
//! # Key Model
//!
//! | Lookup | Key | Reuse |
//! |--------|-----|-------|
//! | Exact | `<ns>-<target>-<tool>-<revision>` | identical commit |
//! | Fallback | `<ns>-<target>-<tool>-` | newest other commit |
//!
//! Restore and save failures never fail the build.

pub mod key;
pub mod store;

pub use key::{namespace, CacheKey};
pub use store::{CacheRestore, CacheStore, LocalCacheStore};
