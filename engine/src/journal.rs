//! Append-only transfer journal.
//!
//! One structured record per attempted file transfer, appended as a JSON
//! line. Prior entries are never rewritten; the journal is the durable
//! audit trail of what the engine moved, how long it took, and what
//! failed.

use crate::events::ProgressSink;
use crate::error::EngineError;
use crate::model::JobProgress;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::error;

/// One journal line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferLogRecord {
    /// RFC 3339 wall-clock timestamp of the append
    pub timestamp: String,

    /// Job the transfer belongs to
    pub job_name: String,

    /// Source file path
    pub source: PathBuf,

    /// Destination file path (with the encryption suffix if applicable)
    pub destination: PathBuf,

    /// File size in bytes
    pub size_bytes: u64,

    /// Transfer wall-clock duration in milliseconds
    pub transfer_ms: u64,

    /// Time spent in the external encryption tool, milliseconds
    /// (zero for unencrypted files)
    pub encryption_ms: u64,

    /// Failure description for transfers that did not complete
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Append-only log sink consuming progress snapshots.
pub struct TransferJournal {
    path: PathBuf,
    file: Mutex<File>,
}

impl TransferJournal {
    /// Open (or create) the journal file at `path` for appending.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| EngineError::Persistence {
                path: path.clone(),
                source: e,
            })?;
        Ok(TransferJournal {
            path,
            file: Mutex::new(file),
        })
    }

    fn append(&self, record: &TransferLogRecord) -> Result<(), EngineError> {
        let line = serde_json::to_string(record).map_err(|e| EngineError::Persistence {
            path: self.path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;
        let mut file = self.file.lock().unwrap();
        writeln!(file, "{line}").map_err(|e| EngineError::Persistence {
            path: self.path.clone(),
            source: e,
        })
    }
}

impl ProgressSink for TransferJournal {
    fn on_progress(&self, progress: &JobProgress) {
        // The finished signal carries no file; nothing to append.
        let record = match &progress.current {
            Some(record) => record,
            None => return,
        };

        let line = TransferLogRecord {
            timestamp: chrono::Local::now().to_rfc3339(),
            job_name: progress.job_name.clone(),
            source: record.source_path.clone(),
            destination: record.destination_path.clone(),
            size_bytes: record.size,
            transfer_ms: record.transfer_duration().as_millis() as u64,
            encryption_ms: record.encryption_duration.as_millis() as u64,
            error: record.error.clone(),
        };

        if let Err(e) = self.append(&line) {
            error!(job = %progress.job_name, "journal append failed: {e}");
        }
    }
}
