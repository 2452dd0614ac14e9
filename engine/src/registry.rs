//! Running-job registry and cooperative job control.
//!
//! `JobControl` is the handle a front end uses to pause, resume or
//! cancel a running job. Pause parks the worker on a condition variable
//! at the per-file boundary; cancel is a flag checked between files, so
//! an in-flight copy always runs to completion first.
//!
//! `JobRegistry` maps job names to their controls while a run is alive.
//! It subscribes to the progress bus and deregisters a job on the
//! snapshot that reports every file attempted.

use crate::error::EngineError;
use crate::events::ProgressSink;
use crate::model::JobProgress;
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};
use tracing::debug;

#[derive(Debug, Default)]
struct ControlFlags {
    paused: bool,
    cancelled: bool,
}

/// Cooperative pause/cancel handle for one running job.
pub struct JobControl {
    flags: Mutex<ControlFlags>,
    resumed: Condvar,
}

impl JobControl {
    pub fn new() -> Self {
        JobControl {
            flags: Mutex::new(ControlFlags::default()),
            resumed: Condvar::new(),
        }
    }

    /// Ask the job to hold at the next per-file boundary.
    pub fn pause(&self) {
        self.flags.lock().unwrap().paused = true;
    }

    /// Let a paused job continue.
    pub fn resume(&self) {
        let mut flags = self.flags.lock().unwrap();
        flags.paused = false;
        self.resumed.notify_all();
    }

    /// Ask the job to stop before its next file. Also wakes a paused
    /// worker so cancellation is not deferred until resume.
    pub fn cancel(&self) {
        let mut flags = self.flags.lock().unwrap();
        flags.cancelled = true;
        self.resumed.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        self.flags.lock().unwrap().paused
    }

    pub fn is_cancelled(&self) -> bool {
        self.flags.lock().unwrap().cancelled
    }

    /// Block while paused. Returns immediately when not paused, and
    /// returns on cancel so the worker can wind down.
    pub fn wait_while_paused(&self) {
        let mut flags = self.flags.lock().unwrap();
        while flags.paused && !flags.cancelled {
            flags = self.resumed.wait(flags).unwrap();
        }
    }
}

impl Default for JobControl {
    fn default() -> Self {
        JobControl::new()
    }
}

/// Registry of currently running jobs, keyed by job name.
pub struct JobRegistry {
    jobs: Mutex<HashMap<String, Arc<JobControl>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        JobRegistry {
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Register a control under the job's name before execution begins.
    ///
    /// A name may only be running once at a time.
    pub fn register(&self, name: &str, control: Arc<JobControl>) -> Result<(), EngineError> {
        let mut jobs = self.jobs.lock().unwrap();
        if jobs.contains_key(name) {
            return Err(EngineError::JobAlreadyRunning {
                name: name.to_string(),
            });
        }
        debug!(job = name, "registered running job");
        jobs.insert(name.to_string(), control);
        Ok(())
    }

    /// Drop a job from the registry. Idempotent.
    pub fn deregister(&self, name: &str) {
        if self.jobs.lock().unwrap().remove(name).is_some() {
            debug!(job = name, "deregistered job");
        }
    }

    /// Control handle for a running job, if any.
    pub fn control(&self, name: &str) -> Option<Arc<JobControl>> {
        self.jobs.lock().unwrap().get(name).cloned()
    }

    /// Pause a running job by name. Returns false for unknown names.
    pub fn pause(&self, name: &str) -> bool {
        match self.control(name) {
            Some(control) => {
                control.pause();
                true
            }
            None => false,
        }
    }

    /// Resume a paused job by name. Returns false for unknown names.
    pub fn resume(&self, name: &str) -> bool {
        match self.control(name) {
            Some(control) => {
                control.resume();
                true
            }
            None => false,
        }
    }

    /// Cancel a running job by name. Returns false for unknown names.
    pub fn cancel(&self, name: &str) -> bool {
        match self.control(name) {
            Some(control) => {
                control.cancel();
                true
            }
            None => false,
        }
    }

    /// Names of the jobs currently registered as running.
    pub fn running_jobs(&self) -> Vec<String> {
        self.jobs.lock().unwrap().keys().cloned().collect()
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        JobRegistry::new()
    }
}

impl ProgressSink for JobRegistry {
    /// Deregister a job once every file has been attempted, or on the
    /// finished signal (which also covers cancelled and empty runs).
    fn on_progress(&self, progress: &JobProgress) {
        let every_file_attempted =
            progress.total_files > 0 && progress.completed_files >= progress.total_files;
        if every_file_attempted || progress.is_finished() {
            self.deregister(&progress.job_name);
        }
    }
}
