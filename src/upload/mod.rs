//! Resilient package upload
//!
//! Ships a built package to the repository service:
//! - `request`: input validation, before any network call
//! - `multipart`: streaming body, rebuilt for every attempt
//! - `response`: status/body classification
//! - `retry`: attempt budget with exponential backoff
//! - `client`: HTTP transport

pub mod client;
pub mod multipart;
pub mod request;
pub mod response;
pub mod retry;

pub use client::{UploadClient, DEFAULT_SERVER_URL};
pub use request::{split_repository, UploadRequest};
pub use response::{interpret, UploadOutcome, UploadReceipt};
pub use retry::RetryPolicy;
