//! Centralized error types for mailexport.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailexport library.
#[derive(Error, Debug)]
pub enum ExportError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The mail store could not be reached or enumerated.
    #[error("Mail store unavailable: {0}")]
    Connection(String),

    /// A segment of a folder path does not exist.
    #[error("Folder '{segment}' not found in path '{path}'")]
    FolderNotFound { segment: String, path: String },

    /// The configured digest is not one we can compute.
    #[error("Hash algorithm '{name}' is not available. Available algorithms: {supported}")]
    UnsupportedHashAlgorithm { name: String, supported: String },

    /// A saved file could not be read back for hashing.
    #[error("Failed to compute hash for '{path}': {source}")]
    HashFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Filter switches that cannot be combined.
    #[error("Invalid filter configuration: {0}")]
    FilterConfig(String),

    /// Both whole-message export modes were requested.
    #[error("Cannot export as message and as markdown at the same time")]
    ConflictingExportModes,

    /// The mail client refused to write one item.
    #[error("Failed to save {item}: {reason}")]
    SaveFailed { item: String, reason: String },
}

/// Convenience alias for `Result<T, ExportError>`.
pub type Result<T> = std::result::Result<T, ExportError>;

impl ExportError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// `true` for errors that must stop a run before any message is touched.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedHashAlgorithm { .. }
                | Self::FilterConfig(_)
                | Self::ConflictingExportModes
        )
    }
}
