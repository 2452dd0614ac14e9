//! Error types for the backup engine.
//!
//! The primary error type is `EngineError`, which represents job-level
//! errors that prevent a run from starting or continuing. File-level
//! failures are recorded in the FileTransferRecord for that file, not
//! raised as EngineError: the run loop logs them and moves on.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur at the job level.
///
/// `EncryptionFailed` and `CopyFailed` also appear per file inside the
/// pipeline, where they are caught, stamped on the file's record and
/// logged rather than propagated.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Source directory does not exist
    #[error("source directory not found: {}", .path.display())]
    SourceMissing { path: PathBuf },

    /// Source directory is not accessible (permissions)
    #[error("cannot access source {}: {source}", .path.display())]
    SourceAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Job descriptor failed validation
    #[error("invalid job: {reason}")]
    InvalidJob { reason: String },

    /// A job with this name is already registered as running
    #[error("job '{name}' is already running")]
    JobAlreadyRunning { name: String },

    /// Failed to enumerate a directory under the source root
    #[error("failed to enumerate {}: {source}", .path.display())]
    Enumeration {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Differential run found no completed baseline under strict policy
    #[error("no completed backup to diff against under {}", .path.display())]
    BaselineMissing { path: PathBuf },

    /// Failed to create a destination directory
    #[error("failed to create directory {}: {source}", .path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to copy a file (read or write side)
    #[error("failed to copy {}: {source}", .path.display())]
    CopyFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// External encryption tool reported a non-zero exit code
    #[error("encryption failed for {} (exit code {code})", .path.display())]
    EncryptionFailed { path: PathBuf, code: i32 },

    /// External encryption tool could not be launched at all
    #[error("encryption tool unavailable: {reason}")]
    EncryptionUnavailable { reason: String },

    /// Failed to read or write a durable sink file
    #[error("failed to persist {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
