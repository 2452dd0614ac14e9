//! # SafeKeep Engine - Backup Execution Library
//!
//! A headless engine for executing file-backup jobs in Rust.
//! Designed as the foundation for multiple front ends (CLI, GUI,
//! automation).
//!
//! ## Overview
//!
//! The engine runs full and differential backup jobs: it enumerates a
//! source tree, drives each selected file through a copy/encrypt
//! pipeline, and publishes a progress snapshot after every file. It
//! features:
//! - Full and differential strategies with timestamped destinations
//! - Optional per-extension encryption via an external tool
//! - A process-wide governor serializing large-file transfers across jobs
//! - Cooperative pause/continue/cancel through a running-job registry
//! - Durable state and journal sinks fed by a synchronous event bus
//!
//! ## Basic Usage
//!
//! ```no_run
//! use engine::{create_job, run_job, BackupMode, EngineConfig, EngineContext};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = EngineContext::new(EngineConfig::default());
//!
//! let job = create_job("documents", "/home/me/docs", "/mnt/backup", BackupMode::Full)?;
//! let summary = run_job(&job, &ctx)?;
//!
//! println!("copied {} of {} files", summary.files_copied, summary.files_total);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - **model**: Core data structures (BackupJob, FileTransferRecord, JobProgress)
//! - **error**: Error types and handling
//! - **config**: Engine tunables (threshold, encrypt list, baseline policy)
//! - **fs_ops**: Low-level filesystem operations
//! - **encrypt**: External encryption collaborator seam
//! - **governor**: Cross-job large-file gate
//! - **events**: Progress event bus
//! - **registry**: Running-job registry (pause/continue/cancel)
//! - **state**: Durable per-job state sink
//! - **journal**: Append-only transfer log sink
//! - **job**: Job orchestration (create, plan, run)

pub mod model;
pub mod error;
pub mod config;
pub mod fs_ops;
pub mod encrypt;
pub mod governor;
pub mod events;
pub mod registry;
pub mod state;
pub mod journal;
pub mod job;

// Re-export main types and functions
pub use model::{
    BackupJob, BackupMode, FileEntry, FileTransferRecord, JobProgress, JobSummary,
};
pub use error::EngineError;
pub use config::{BaselinePolicy, EngineConfig, DEFAULT_LARGE_FILE_THRESHOLD};
pub use encrypt::{encrypted_target_path, CommandEncryptor, Encryptor, ENCRYPTED_EXTENSION};
pub use governor::{TransferGovernor, TransferPermit};
pub use events::{ProgressBus, ProgressSink};
pub use registry::{JobControl, JobRegistry};
pub use state::{JobLifecycle, PersistedJobState, StateSink};
pub use journal::{TransferJournal, TransferLogRecord};
pub use job::{create_job, plan_job, run_job, run_job_with_control, BackupPlan, EngineContext};
