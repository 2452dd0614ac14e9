//! Job orchestration module.
//!
//! This module provides the main job lifecycle functions:
//! - Creating a job descriptor from source/destination paths
//! - Planning a job (strategy file selection + destination stamping)
//! - Running a job (driving each file through the copy pipeline)
//!
//! A run publishes a progress snapshot after every attempted file and a
//! final finished snapshot (no current file); the registry, state sink
//! and journal react as bus subscribers. Individual file failures are
//! logged and never abort the job.

use crate::config::{BaselinePolicy, EngineConfig};
use crate::encrypt::{encrypted_target_path, CommandEncryptor, Encryptor};
use crate::error::EngineError;
use crate::events::ProgressBus;
use crate::fs_ops;
use crate::governor::TransferGovernor;
use crate::model::{
    BackupJob, BackupMode, FileEntry, FileTransferRecord, JobProgress, JobSummary,
};
use crate::registry::{JobControl, JobRegistry};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use tracing::{debug, info, warn};

/// Shared engine services, wired once by the caller and handed to every
/// run. Tests build isolated contexts; nothing here is process-global.
pub struct EngineContext {
    pub config: EngineConfig,
    pub governor: Arc<TransferGovernor>,
    pub bus: Arc<ProgressBus>,
    pub registry: Arc<JobRegistry>,
    pub encryptor: Arc<dyn Encryptor>,
}

impl EngineContext {
    /// Build a context from configuration.
    ///
    /// The registry is subscribed to the bus here so its
    /// auto-deregistration contract holds for every run on this context.
    pub fn new(config: EngineConfig) -> Self {
        let registry = Arc::new(JobRegistry::new());
        let bus = Arc::new(ProgressBus::new());
        bus.subscribe(registry.clone());

        let encryptor: Arc<dyn Encryptor> =
            Arc::new(CommandEncryptor::new(config.encryption_program.clone()));

        EngineContext {
            governor: Arc::new(TransferGovernor::default()),
            bus,
            registry,
            encryptor,
            config,
        }
    }

    /// Swap the encryption collaborator (tests, alternate tools).
    pub fn with_encryptor(mut self, encryptor: Arc<dyn Encryptor>) -> Self {
        self.encryptor = encryptor;
        self
    }
}

/// The files a strategy selected and where they go.
#[derive(Debug)]
pub struct BackupPlan {
    /// Files to drive through the pipeline, in enumeration order
    pub files: Vec<FileEntry>,

    /// Timestamped destination root (`.../Complete/<ts>` or
    /// `.../Differential/<ts>`)
    pub dest_root: std::path::PathBuf,

    /// Sum of the selected files' sizes
    pub total_bytes: u64,
}

/// Create a new backup job descriptor.
///
/// Validates that the name is usable and the source exists and is a
/// directory. The destination may not exist yet; it is created at run
/// time.
pub fn create_job(
    name: &str,
    source: impl AsRef<Path>,
    destination: impl AsRef<Path>,
    mode: BackupMode,
) -> Result<BackupJob, EngineError> {
    let source = source.as_ref();
    let destination = destination.as_ref();

    if name.trim().is_empty() {
        return Err(EngineError::InvalidJob {
            reason: "job name must not be empty".to_string(),
        });
    }

    match fs::metadata(source) {
        Ok(metadata) if metadata.is_dir() => {}
        Ok(_) => {
            return Err(EngineError::InvalidJob {
                reason: format!("source must be a directory: {}", source.display()),
            });
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(EngineError::SourceMissing {
                path: source.to_path_buf(),
            });
        }
        Err(e) => {
            return Err(EngineError::SourceAccess {
                path: source.to_path_buf(),
                source: e,
            });
        }
    }

    Ok(BackupJob {
        id: uuid::Uuid::new_v4(),
        name: name.to_string(),
        source: source.to_path_buf(),
        destination: destination.to_path_buf(),
        mode,
        created_at: SystemTime::now(),
    })
}

/// Timestamp used for destination subfolder names.
fn run_stamp() -> String {
    chrono::Local::now().format("%Y-%m-%d_%H-%M-%S").to_string()
}

/// Creation time of the most recently created `Complete/<ts>` folder,
/// or None when the root is missing or holds no subfolders.
///
/// Platforms without a birth time fall back to the folder's modification
/// time; baseline folders are written once, so the two coincide.
fn latest_complete_backup(complete_root: &Path) -> Result<Option<SystemTime>, EngineError> {
    let read_dir = match fs::read_dir(complete_root) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(EngineError::Enumeration {
                path: complete_root.to_path_buf(),
                source: e,
            });
        }
    };

    let mut latest: Option<SystemTime> = None;
    for entry in read_dir {
        let entry = entry.map_err(|e| EngineError::Enumeration {
            path: complete_root.to_path_buf(),
            source: e,
        })?;
        let metadata = entry.metadata().map_err(|e| EngineError::Enumeration {
            path: entry.path(),
            source: e,
        })?;
        if !metadata.is_dir() {
            continue;
        }
        let created = metadata
            .created()
            .or_else(|_| metadata.modified())
            .map_err(|e| EngineError::Enumeration {
                path: entry.path(),
                source: e,
            })?;
        if latest.map_or(true, |t| created > t) {
            latest = Some(created);
        }
    }
    Ok(latest)
}

/// Plan a job: enumerate the source and apply the strategy's selection.
///
/// Full selects everything. Differential selects files modified strictly
/// after the latest `Complete` backup's creation time; with no baseline
/// it follows the configured policy (fall back to full, or fail).
pub fn plan_job(job: &BackupJob, config: &EngineConfig) -> Result<BackupPlan, EngineError> {
    if !job.source.is_dir() {
        return Err(EngineError::SourceMissing {
            path: job.source.clone(),
        });
    }

    let mut files = fs_ops::enumerate_files(&job.source)?;

    if job.mode == BackupMode::Differential {
        let complete_root = job.destination.join(BackupMode::Full.subfolder());
        match latest_complete_backup(&complete_root)? {
            Some(cutoff) => {
                files.retain(|f| f.modified > cutoff);
            }
            None => match config.baseline_policy {
                // A differential run with no baseline behaves as a full
                // run; "root missing" and "root empty" are the same case.
                BaselinePolicy::FallBackToFull => {}
                BaselinePolicy::RequireBaseline => {
                    return Err(EngineError::BaselineMissing {
                        path: complete_root,
                    });
                }
            },
        }
    }

    let total_bytes = files.iter().map(|f| f.size).sum();
    let dest_root = job
        .destination
        .join(job.mode.subfolder())
        .join(run_stamp());

    Ok(BackupPlan {
        files,
        dest_root,
        total_bytes,
    })
}

/// Drive one file through the pipeline: governor gate, directory
/// mapping, encrypt-or-copy, timing. Failures end up on the record, not
/// as errors; the run loop keeps going.
fn copy_one(entry: &FileEntry, dest_root: &Path, ctx: &EngineContext) -> FileTransferRecord {
    let target = dest_root.join(&entry.relative_path);

    // Large transfers contend for the single process-wide permit. The
    // guard is dropped when this function returns, before the publish
    // and the pause checkpoint.
    let _permit = ctx
        .config
        .is_large(entry.size)
        .then(|| ctx.governor.acquire());

    let mut record = FileTransferRecord::begin(entry, target.clone());
    let outcome = transfer(entry, &target, &mut record, ctx);
    record.finished_at = SystemTime::now();

    if let Err(e) = outcome {
        warn!(
            source = %entry.source_path.display(),
            "file transfer failed: {e}"
        );
        record.error = Some(e.to_string());
    } else {
        debug!(
            source = %entry.source_path.display(),
            target = %record.destination_path.display(),
            bytes = record.size,
            "file transferred"
        );
    }
    record
}

fn transfer(
    entry: &FileEntry,
    target: &Path,
    record: &mut FileTransferRecord,
    ctx: &EngineContext,
) -> Result<(), EngineError> {
    fs_ops::ensure_parent_dir_exists(target)?;

    if ctx.config.should_encrypt(&entry.source_path) {
        let started = Instant::now();
        let code = ctx.encryptor.encrypt(
            &entry.source_path,
            target,
            &ctx.config.encryption_password,
        )?;
        if code != 0 {
            return Err(EngineError::EncryptionFailed {
                path: entry.source_path.clone(),
                code,
            });
        }
        record.encryption_duration = started.elapsed();
        record.destination_path = encrypted_target_path(target);
    } else {
        fs_ops::copy_file_with_metadata(&entry.source_path, target)?;
    }
    Ok(())
}

/// Run a job with a fresh control handle.
pub fn run_job(job: &BackupJob, ctx: &EngineContext) -> Result<JobSummary, EngineError> {
    run_job_with_control(job, Arc::new(JobControl::new()), ctx)
}

/// Run a job under a caller-supplied control handle.
///
/// The control is registered under the job's name before execution
/// begins, so a front end can pause or cancel from the first file on.
/// On a job-level failure the registry entry is removed before the error
/// is returned; nothing is ever left stuck "running".
pub fn run_job_with_control(
    job: &BackupJob,
    control: Arc<JobControl>,
    ctx: &EngineContext,
) -> Result<JobSummary, EngineError> {
    ctx.registry.register(&job.name, control.clone())?;

    match execute(job, &control, ctx) {
        Ok(summary) => Ok(summary),
        Err(e) => {
            ctx.registry.deregister(&job.name);
            Err(e)
        }
    }
}

fn execute(
    job: &BackupJob,
    control: &JobControl,
    ctx: &EngineContext,
) -> Result<JobSummary, EngineError> {
    info!(job = %job.name, mode = %job.mode, source = %job.source.display(), "starting backup");

    let plan = plan_job(job, &ctx.config)?;
    fs::create_dir_all(&plan.dest_root).map_err(|e| EngineError::DirectoryCreation {
        path: plan.dest_root.clone(),
        source: e,
    })?;

    let mut progress = JobProgress::new(job, plan.files.len(), plan.total_bytes);
    let mut summary = JobSummary {
        files_total: plan.files.len(),
        files_copied: 0,
        files_failed: 0,
        bytes_transferred: 0,
        cancelled: false,
    };

    for (index, entry) in plan.files.iter().enumerate() {
        // Cancellation is cooperative: checked between files only, so an
        // in-flight copy always runs to completion first.
        if control.is_cancelled() {
            info!(job = %job.name, "backup cancelled");
            summary.cancelled = true;
            break;
        }

        let record = copy_one(entry, &plan.dest_root, ctx);

        progress.completed_files += 1;
        if record.error.is_none() {
            summary.files_copied += 1;
            summary.bytes_transferred += record.size;
            progress.bytes_transferred += record.size;
            progress.last_completed = Some(record.clone());
        } else {
            summary.files_failed += 1;
        }
        progress.current = Some(record);
        ctx.bus.publish(&progress);

        // Pause checkpoint: between files, never while holding the
        // governor permit. Skipped after the last file.
        if index + 1 < plan.files.len() {
            control.wait_while_paused();
        }
    }

    // Finished signal: no current file. The state sink resets the entry
    // and the registry drops the name (also covers cancelled runs).
    progress.current = None;
    ctx.bus.publish(&progress);

    info!(
        job = %job.name,
        copied = summary.files_copied,
        failed = summary.files_failed,
        bytes = summary.bytes_transferred,
        cancelled = summary.cancelled,
        "backup finished"
    );
    Ok(summary)
}
