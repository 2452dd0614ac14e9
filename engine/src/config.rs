//! Engine configuration.
//!
//! The engine consumes this read-only; ownership of where the values come
//! from (settings file, UI, defaults) stays with the caller.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default large-file threshold: 1 MiB.
pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = 1024 * 1024;

/// What a differential run does when no completed baseline exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaselinePolicy {
    /// Behave as a full run and copy everything
    FallBackToFull,
    /// Fail the run with `BaselineMissing`
    RequireBaseline,
}

impl Default for BaselinePolicy {
    fn default() -> Self {
        BaselinePolicy::FallBackToFull
    }
}

/// Tunables consumed by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Files strictly larger than this (bytes) contend for the governor
    pub large_file_threshold: u64,

    /// Extensions routed through the external encryption tool,
    /// lowercase, without the leading dot
    pub encrypt_extensions: Vec<String>,

    /// Password handed to the encryption tool
    pub encryption_password: String,

    /// Path of the external encryption program; `None` disables
    /// encryption even for matching extensions
    pub encryption_program: Option<PathBuf>,

    /// Differential behavior when no baseline exists
    pub baseline_policy: BaselinePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            large_file_threshold: DEFAULT_LARGE_FILE_THRESHOLD,
            encrypt_extensions: Vec::new(),
            encryption_password: String::new(),
            encryption_program: None,
            baseline_policy: BaselinePolicy::default(),
        }
    }
}

impl EngineConfig {
    /// True when `path`'s extension is on the encrypt list.
    ///
    /// Comparison is case-insensitive and tolerates configured entries
    /// written with a leading dot.
    pub fn should_encrypt(&self, path: &Path) -> bool {
        let ext = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => ext.to_lowercase(),
            None => return false,
        };
        self.encrypt_extensions
            .iter()
            .any(|e| e.trim_start_matches('.').to_lowercase() == ext)
    }

    /// True when a file of `size` bytes must hold the governor permit.
    pub fn is_large(&self, size: u64) -> bool {
        size > self.large_file_threshold
    }
}
