//! Durable per-job state sink.
//!
//! Keeps one `PersistedJobState` per job name and rewrites the whole
//! collection to disk on every snapshot, so monitors and a recovering
//! process always see the latest picture. The file is written through a
//! temp file and rename; a crash mid-write never leaves it truncated.

use crate::events::ProgressSink;
use crate::error::EngineError;
use crate::model::JobProgress;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::error;

/// Lifecycle of a job as recorded in the state file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobLifecycle {
    /// A run is executing this job right now
    Active,
    /// The job has an entry but no live run (includes runs that died)
    Inactive,
    /// The last run finished and the entry was reset
    Completed,
}

impl std::fmt::Display for JobLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobLifecycle::Active => write!(f, "Active"),
            JobLifecycle::Inactive => write!(f, "Inactive"),
            JobLifecycle::Completed => write!(f, "Completed"),
        }
    }
}

/// Durable status row for one job name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedJobState {
    /// Job name (unique key of the collection)
    pub name: String,

    /// Source path of the file currently being transferred
    pub current_source: Option<PathBuf>,

    /// Target path of the file currently being transferred
    pub current_target: Option<PathBuf>,

    /// Lifecycle of the job
    pub lifecycle: JobLifecycle,

    /// Files selected for the run
    pub total_files: u64,

    /// Bytes transferred so far
    pub bytes_transferred: u64,

    /// Files not yet attempted
    pub files_remaining: u64,

    /// Whole percent of files attempted
    pub percent_complete: u8,
}

impl PersistedJobState {
    fn from_progress(progress: &JobProgress) -> Self {
        let current = progress.current.as_ref();
        PersistedJobState {
            name: progress.job_name.clone(),
            current_source: current.map(|r| r.source_path.clone()),
            current_target: current.map(|r| r.destination_path.clone()),
            lifecycle: JobLifecycle::Active,
            total_files: progress.total_files as u64,
            bytes_transferred: progress.bytes_transferred,
            files_remaining: progress.files_remaining() as u64,
            percent_complete: progress.percent_complete(),
        }
    }

    /// Terminal form: transient fields cleared, lifecycle Completed.
    fn completed(name: &str) -> Self {
        PersistedJobState {
            name: name.to_string(),
            current_source: None,
            current_target: None,
            lifecycle: JobLifecycle::Completed,
            total_files: 0,
            bytes_transferred: 0,
            files_remaining: 0,
            percent_complete: 0,
        }
    }
}

/// Sink that upserts job state rows and rewrites the state file on every
/// snapshot.
pub struct StateSink {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, PersistedJobState>>,
}

impl StateSink {
    /// Open (or create) the state file at `path`.
    ///
    /// Entries left `Active` by a previous process are downgraded to
    /// `Inactive`: their run is no longer alive.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let path = path.into();
        let mut entries = BTreeMap::new();

        match fs::read_to_string(&path) {
            Ok(text) => {
                let rows: Vec<PersistedJobState> =
                    serde_json::from_str(&text).map_err(|e| EngineError::Persistence {
                        path: path.clone(),
                        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
                    })?;
                for mut row in rows {
                    if row.lifecycle == JobLifecycle::Active {
                        row.lifecycle = JobLifecycle::Inactive;
                    }
                    entries.insert(row.name.clone(), row);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(EngineError::Persistence { path, source: e });
            }
        }

        Ok(StateSink {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Snapshot of the current collection, sorted by job name.
    pub fn entries(&self) -> Vec<PersistedJobState> {
        self.entries.lock().unwrap().values().cloned().collect()
    }

    /// Current row for one job name.
    pub fn entry(&self, name: &str) -> Option<PersistedJobState> {
        self.entries.lock().unwrap().get(name).cloned()
    }

    fn rewrite(&self, entries: &BTreeMap<String, PersistedJobState>) -> Result<(), EngineError> {
        let rows: Vec<&PersistedJobState> = entries.values().collect();
        let json = serde_json::to_string_pretty(&rows).map_err(|e| EngineError::Persistence {
            path: self.path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json).map_err(|e| EngineError::Persistence {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| EngineError::Persistence {
            path: self.path.clone(),
            source: e,
        })
    }
}

impl ProgressSink for StateSink {
    fn on_progress(&self, progress: &JobProgress) {
        let row = if progress.is_finished() {
            PersistedJobState::completed(&progress.job_name)
        } else {
            PersistedJobState::from_progress(progress)
        };

        let mut entries = self.entries.lock().unwrap();
        entries.insert(row.name.clone(), row);
        if let Err(e) = self.rewrite(&entries) {
            // A sink cannot fail the run; surface it on the error channel.
            error!(job = %progress.job_name, "state sink write failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BackupJob, BackupMode, FileEntry, FileTransferRecord};
    use std::time::SystemTime;
    use uuid::Uuid;

    fn progress_with_current(name: &str, total: usize, completed: usize) -> JobProgress {
        let job = BackupJob {
            id: Uuid::new_v4(),
            name: name.to_string(),
            source: PathBuf::from("/s"),
            destination: PathBuf::from("/d"),
            mode: BackupMode::Full,
            created_at: SystemTime::now(),
        };
        let entry = FileEntry {
            source_path: PathBuf::from("/s/a.txt"),
            relative_path: PathBuf::from("a.txt"),
            size: 10,
            modified: SystemTime::now(),
        };
        let mut progress = JobProgress::new(&job, total, 100);
        progress.completed_files = completed;
        progress.bytes_transferred = completed as u64 * 10;
        progress.current = Some(FileTransferRecord::begin(&entry, PathBuf::from("/d/a.txt")));
        progress
    }

    fn finished_progress(name: &str, total: usize) -> JobProgress {
        let mut progress = progress_with_current(name, total, total);
        progress.current = None;
        progress
    }

    #[test]
    fn test_upsert_writes_active_row() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        let sink = StateSink::open(&path).expect("open");

        sink.on_progress(&progress_with_current("docs", 4, 1));

        let row = sink.entry("docs").expect("row exists");
        assert_eq!(row.lifecycle, JobLifecycle::Active);
        assert_eq!(row.total_files, 4);
        assert_eq!(row.files_remaining, 3);
        assert_eq!(row.percent_complete, 25);
        assert_eq!(row.current_source, Some(PathBuf::from("/s/a.txt")));
        assert!(path.exists());
    }

    #[test]
    fn test_finished_signal_resets_entry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sink = StateSink::open(dir.path().join("state.json")).expect("open");

        sink.on_progress(&progress_with_current("docs", 2, 1));
        sink.on_progress(&finished_progress("docs", 2));

        let row = sink.entry("docs").expect("row exists");
        assert_eq!(row.lifecycle, JobLifecycle::Completed);
        assert_eq!(row.total_files, 0);
        assert_eq!(row.bytes_transferred, 0);
        assert!(row.current_source.is_none());
    }

    #[test]
    fn test_one_row_per_job_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        let sink = StateSink::open(&path).expect("open");

        sink.on_progress(&progress_with_current("docs", 4, 1));
        sink.on_progress(&progress_with_current("docs", 4, 2));
        sink.on_progress(&progress_with_current("music", 1, 0));

        assert_eq!(sink.entries().len(), 2);

        let rows: Vec<PersistedJobState> =
            serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("parse");
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_reload_downgrades_stale_active_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");

        {
            let sink = StateSink::open(&path).expect("open");
            sink.on_progress(&progress_with_current("docs", 4, 1));
        } // process "crashes" with docs still Active

        let sink = StateSink::open(&path).expect("reopen");
        let row = sink.entry("docs").expect("row survived");
        assert_eq!(row.lifecycle, JobLifecycle::Inactive);
    }

    #[test]
    fn test_open_rejects_corrupt_file(){
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        fs::write(&path, "not json").expect("write");

        assert!(StateSink::open(&path).is_err());
    }
}
