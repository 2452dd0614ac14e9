//! Cross-job concurrency governor.
//!
//! A process-wide counting semaphore (one permit by default) that gates
//! large-file transfers across every running job, so unrelated jobs
//! cannot saturate the disk with simultaneous bulk copies. Small files
//! never touch it.

use std::sync::{Condvar, Mutex};

/// Blocking semaphore guarding large-file transfers.
///
/// Acquire blocks the calling worker thread; the permit is released by
/// dropping the returned guard, which ties release to scope and makes
/// double-release unrepresentable.
pub struct TransferGovernor {
    permits: Mutex<usize>,
    available: Condvar,
}

impl TransferGovernor {
    /// Governor with `permits` simultaneous large transfers allowed.
    pub fn new(permits: usize) -> Self {
        TransferGovernor {
            permits: Mutex::new(permits),
            available: Condvar::new(),
        }
    }

    /// Block until a permit is free, then take it.
    pub fn acquire(&self) -> TransferPermit<'_> {
        let mut permits = self.permits.lock().unwrap();
        while *permits == 0 {
            permits = self.available.wait(permits).unwrap();
        }
        *permits -= 1;
        TransferPermit { governor: self }
    }

    /// Permits currently free (diagnostics only).
    pub fn available_permits(&self) -> usize {
        *self.permits.lock().unwrap()
    }

    fn release(&self) {
        let mut permits = self.permits.lock().unwrap();
        *permits += 1;
        self.available.notify_one();
    }
}

impl Default for TransferGovernor {
    /// Single-permit governor: at most one large transfer in flight
    /// process-wide.
    fn default() -> Self {
        TransferGovernor::new(1)
    }
}

/// RAII guard for one governor permit.
pub struct TransferPermit<'a> {
    governor: &'a TransferGovernor,
}

impl Drop for TransferPermit<'_> {
    fn drop(&mut self) {
        self.governor.release();
    }
}
