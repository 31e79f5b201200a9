//! Error types for pkgflow
//!
//! All modules use `PkgflowResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pkgflow operations
pub type PkgflowResult<T> = Result<T, PkgflowError>;

/// Broad classification of a failure, used for reporting and retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing input; reported immediately
    Validation,
    /// Workspace setup or build tool failure
    Environment,
    /// Expected output was not produced
    NotFound,
    /// Network fault that survived the retry budget
    TransientNetwork,
    /// The remote service answered with a malformed success response
    ContractViolation,
    /// Anything else (serialization, config, bugs)
    Internal,
}

/// All errors that can occur in pkgflow
#[derive(Error, Debug)]
pub enum PkgflowError {
    // Validation errors
    #[error("Invalid repository format: {0}. Expected format: org/repo")]
    InvalidRepository(String),

    #[error("Missing required input: {0}")]
    MissingInput(&'static str),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    // Environment errors
    #[error("Failed to prepare workspace {path}: {source}")]
    WorkspaceSetup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Packaging tool exited with code {code}:\n{output}")]
    BuildFailed { code: i32, output: String },

    #[error("Packaging tool terminated by signal")]
    BuildSignaled,

    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Not found errors
    #[error("No package file found in output directory {0}")]
    NoArtifactFound(PathBuf),

    // Network errors
    #[error("{last}")]
    UploadExhausted { attempts: u32, last: String },

    // Contract violations
    #[error("No UUID returned in response")]
    MissingIdentifier,

    #[error("Invalid upload response: {0}")]
    InvalidResponse(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Cache errors
    #[error("Cache store error for key {key}: {reason}")]
    CacheStore { key: String, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl PkgflowError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a cache store error
    pub fn cache(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CacheStore {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRepository(_)
            | Self::MissingInput(_)
            | Self::FileNotFound(_)
            | Self::ConfigInvalid { .. }
            | Self::User(_) => ErrorKind::Validation,
            Self::WorkspaceSetup { .. }
            | Self::BuildFailed { .. }
            | Self::BuildSignaled
            | Self::CommandFailed { .. }
            | Self::ConfigDirCreate { .. }
            | Self::CacheStore { .. }
            | Self::Io { .. } => ErrorKind::Environment,
            Self::NoArtifactFound(_) => ErrorKind::NotFound,
            Self::UploadExhausted { .. } => ErrorKind::TransientNetwork,
            Self::MissingIdentifier | Self::InvalidResponse(_) => ErrorKind::ContractViolation,
            Self::Json(_) | Self::TomlSerialize(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Check if error is retryable
    ///
    /// Only network faults qualify. Build tool failures are deterministic and
    /// never retried.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::TransientNetwork
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidRepository(_) => Some("Pass --repository as <org>/<repo>"),
            Self::NoArtifactFound(_) => {
                Some("Check the packaging tool output; it must write a .deb or .rpm file")
            }
            Self::CommandFailed { .. } => Some("Is docker (or podman) installed and on PATH?"),
            Self::MissingIdentifier | Self::InvalidResponse(_) => {
                Some("The repository service returned an unexpected body")
            }
            _ => None,
        }
    }
}
