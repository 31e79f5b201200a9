//! pkgflow - build and publish Linux packages
//!
//! Drives a containerized packaging tool to produce a .deb or .rpm with a
//! persistent build cache, then uploads it to a package repository with
//! retries.

pub mod artifact;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod identity;
pub mod orchestration;
pub mod outputs;
pub mod secrets;
pub mod ui;
pub mod upload;

pub use error::{PkgflowError, PkgflowResult};
