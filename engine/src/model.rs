//! Core data model for backup jobs.
//!
//! This module defines the main data structures for representing backup
//! operations:
//! - BackupJob: one configured source -> destination backup task
//! - FileEntry: a file selected for transfer by a strategy
//! - FileTransferRecord: the outcome of one file's trip through the pipeline
//! - JobProgress: the snapshot published after each file
//! - BackupMode, JobSummary: enums and value types controlling behavior

use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

/// One configured backup job: a named source -> destination task.
///
/// `name` is the correlation key across the registry, the state sink and
/// the journal; two jobs must never share it.
#[derive(Debug, Clone)]
pub struct BackupJob {
    /// Unique identifier for this job
    pub id: Uuid,

    /// Unique human-readable name, used as the correlation key
    pub name: String,

    /// Root source directory
    pub source: PathBuf,

    /// Root destination directory
    pub destination: PathBuf,

    /// Full or differential run
    pub mode: BackupMode,

    /// When the job descriptor was created
    pub created_at: SystemTime,
}

/// Strategy selector for a backup run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupMode {
    /// Copy every file under the source into a fresh `Complete` folder
    Full,
    /// Copy only files modified after the latest full backup
    Differential,
}

impl BackupMode {
    /// Destination subfolder this mode writes under.
    pub fn subfolder(&self) -> &'static str {
        match self {
            BackupMode::Full => "Complete",
            BackupMode::Differential => "Differential",
        }
    }

    /// Parse a mode from a string (CLI input).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "full" => Some(BackupMode::Full),
            "differential" | "diff" => Some(BackupMode::Differential),
            _ => None,
        }
    }
}

impl std::fmt::Display for BackupMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackupMode::Full => write!(f, "Full"),
            BackupMode::Differential => write!(f, "Differential"),
        }
    }
}

/// A single file selected for transfer during planning.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Full source path
    pub source_path: PathBuf,

    /// Path relative to the job's source root
    pub relative_path: PathBuf,

    /// File size in bytes
    pub size: u64,

    /// Source modification time (drives differential selection)
    pub modified: SystemTime,
}

/// Record of one file's trip through the copy pipeline.
///
/// Created when the pipeline picks the file up, finalized when the copy
/// (or encryption) finishes. Immutable once published.
#[derive(Debug, Clone)]
pub struct FileTransferRecord {
    /// Full source path
    pub source_path: PathBuf,

    /// Full destination path; carries the encrypted-artifact suffix when
    /// the file went through the encryption collaborator
    pub destination_path: PathBuf,

    /// When the pipeline picked the file up
    pub started_at: SystemTime,

    /// When the transfer finished (success or failure)
    pub finished_at: SystemTime,

    /// File size in bytes
    pub size: u64,

    /// Time spent inside the external encryption tool (zero if the file
    /// was not encrypted)
    pub encryption_duration: Duration,

    /// Failure description when the file could not be transferred
    pub error: Option<String>,
}

impl FileTransferRecord {
    /// Start a record for a file about to be transferred.
    pub fn begin(entry: &FileEntry, destination: PathBuf) -> Self {
        let now = SystemTime::now();
        FileTransferRecord {
            source_path: entry.source_path.clone(),
            destination_path: destination,
            started_at: now,
            finished_at: now,
            size: entry.size,
            encryption_duration: Duration::ZERO,
            error: None,
        }
    }

    /// Wall-clock duration of the transfer.
    pub fn transfer_duration(&self) -> Duration {
        self.finished_at
            .duration_since(self.started_at)
            .unwrap_or(Duration::ZERO)
    }
}

/// Progress snapshot for one running job.
///
/// Owned and mutated exclusively by the worker thread executing the job;
/// each mutation is published on the bus and subscribers receive a
/// read-only view.
#[derive(Debug, Clone)]
pub struct JobProgress {
    /// Id of the job this snapshot belongs to
    pub job_id: Uuid,

    /// Name of the job (correlation key for sinks and the registry)
    pub job_name: String,

    /// Record of the file the pipeline is on (the one just transferred);
    /// `None` is the finished signal
    pub current: Option<FileTransferRecord>,

    /// Last successfully completed record
    pub last_completed: Option<FileTransferRecord>,

    /// Number of files selected for this run; fixed once planning ends
    pub total_files: usize,

    /// Files attempted so far (successes and failures alike);
    /// monotonically non-decreasing within one run
    pub completed_files: usize,

    /// Sum of the selected files' sizes
    pub total_bytes: u64,

    /// Bytes successfully transferred so far
    pub bytes_transferred: u64,
}

impl JobProgress {
    /// Fresh snapshot for a planned job, before any file is copied.
    pub fn new(job: &BackupJob, total_files: usize, total_bytes: u64) -> Self {
        JobProgress {
            job_id: job.id,
            job_name: job.name.clone(),
            current: None,
            last_completed: None,
            total_files,
            completed_files: 0,
            total_bytes,
            bytes_transferred: 0,
        }
    }

    /// True once the strategy has signalled the end of the run.
    pub fn is_finished(&self) -> bool {
        self.current.is_none()
    }

    /// Files not yet attempted.
    pub fn files_remaining(&self) -> usize {
        self.total_files.saturating_sub(self.completed_files)
    }

    /// Whole percent of files attempted (100 for an empty run).
    pub fn percent_complete(&self) -> u8 {
        if self.total_files == 0 {
            100
        } else {
            (self.completed_files * 100 / self.total_files) as u8
        }
    }
}

/// Outcome of a completed (or cancelled) run, returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    /// Files selected by the strategy
    pub files_total: usize,

    /// Files transferred successfully
    pub files_copied: usize,

    /// Files that failed and were skipped over
    pub files_failed: usize,

    /// Bytes successfully transferred
    pub bytes_transferred: u64,

    /// True when the run stopped early on a cancel request
    pub cancelled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job() -> BackupJob {
        BackupJob {
            id: Uuid::new_v4(),
            name: "docs".to_string(),
            source: PathBuf::from("/tmp/src"),
            destination: PathBuf::from("/tmp/dst"),
            mode: BackupMode::Full,
            created_at: SystemTime::now(),
        }
    }

    #[test]
    fn test_mode_subfolder_names() {
        assert_eq!(BackupMode::Full.subfolder(), "Complete");
        assert_eq!(BackupMode::Differential.subfolder(), "Differential");
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(BackupMode::parse("full"), Some(BackupMode::Full));
        assert_eq!(BackupMode::parse("Diff"), Some(BackupMode::Differential));
        assert_eq!(BackupMode::parse("differential"), Some(BackupMode::Differential));
        assert_eq!(BackupMode::parse("incremental"), None);
    }

    #[test]
    fn test_progress_percent_and_remaining() {
        let mut progress = JobProgress::new(&sample_job(), 4, 400);
        assert_eq!(progress.percent_complete(), 0);
        assert_eq!(progress.files_remaining(), 4);

        progress.completed_files = 3;
        assert_eq!(progress.percent_complete(), 75);
        assert_eq!(progress.files_remaining(), 1);
    }

    #[test]
    fn test_progress_empty_run_is_complete() {
        let progress = JobProgress::new(&sample_job(), 0, 0);
        assert_eq!(progress.percent_complete(), 100);
        assert!(progress.is_finished());
    }

    #[test]
    fn test_record_transfer_duration_never_negative() {
        let entry = FileEntry {
            source_path: PathBuf::from("/tmp/a"),
            relative_path: PathBuf::from("a"),
            size: 1,
            modified: SystemTime::now(),
        };
        let mut record = FileTransferRecord::begin(&entry, PathBuf::from("/tmp/b"));
        // Clock skew: finished before started still reports zero.
        record.finished_at = record.started_at - Duration::from_secs(1);
        assert_eq!(record.transfer_duration(), Duration::ZERO);
    }
}
