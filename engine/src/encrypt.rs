//! External encryption collaborator.
//!
//! Encryption is delegated to an opaque external program: it receives a
//! source file, a target path and a password, and either produces the
//! encrypted artifact at the target path with the `.enc` suffix added,
//! or exits non-zero. The engine only sees the exit code.
//!
//! The `Encryptor` trait keeps the seam mockable; `CommandEncryptor` is
//! the production implementation.

use crate::error::EngineError;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Suffix the encryption tool appends to its output artifact.
pub const ENCRYPTED_EXTENSION: &str = "enc";

/// Destination path as it looks after the tool has added its suffix.
pub fn encrypted_target_path(target: &Path) -> PathBuf {
    let mut os = target.as_os_str().to_os_string();
    os.push(".");
    os.push(ENCRYPTED_EXTENSION);
    PathBuf::from(os)
}

/// The seam to the external encryption utility.
pub trait Encryptor: Send + Sync {
    /// Encrypt `source` into `target` (plus suffix) using `password`.
    ///
    /// Returns the tool's exit code; zero means the artifact exists.
    /// Errors are reserved for the tool being unlaunchable.
    fn encrypt(&self, source: &Path, target: &Path, password: &str)
        -> Result<i32, EngineError>;
}

/// Runs the configured encryption program as
/// `program <source> <target> <password>`.
pub struct CommandEncryptor {
    program: Option<PathBuf>,
}

impl CommandEncryptor {
    pub fn new(program: Option<PathBuf>) -> Self {
        CommandEncryptor { program }
    }
}

impl Encryptor for CommandEncryptor {
    fn encrypt(
        &self,
        source: &Path,
        target: &Path,
        password: &str,
    ) -> Result<i32, EngineError> {
        let program = self.program.as_ref().ok_or_else(|| {
            EngineError::EncryptionUnavailable {
                reason: "no encryption program configured".to_string(),
            }
        })?;

        let status = Command::new(program)
            .arg(source)
            .arg(target)
            .arg(password)
            .status()
            .map_err(|e| EngineError::EncryptionUnavailable {
                reason: format!("{}: {}", program.display(), e),
            })?;

        // A signal-killed child has no exit code; report it as a failure.
        Ok(status.code().unwrap_or(-1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypted_target_path_appends_suffix() {
        let target = Path::new("/backup/docs/report.pdf");
        assert_eq!(
            encrypted_target_path(target),
            PathBuf::from("/backup/docs/report.pdf.enc")
        );
    }

    #[test]
    fn test_encryptor_without_program_is_unavailable() {
        let encryptor = CommandEncryptor::new(None);
        let result = encryptor.encrypt(Path::new("a"), Path::new("b"), "pw");
        assert!(matches!(
            result,
            Err(EngineError::EncryptionUnavailable { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_encryptor_reports_exit_code() {
        let ok = CommandEncryptor::new(Some(PathBuf::from("true")));
        assert_eq!(ok.encrypt(Path::new("a"), Path::new("b"), "pw").unwrap(), 0);

        let fail = CommandEncryptor::new(Some(PathBuf::from("false")));
        assert_ne!(
            fail.encrypt(Path::new("a"), Path::new("b"), "pw").unwrap(),
            0
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_command_encryptor_missing_program() {
        let encryptor =
            CommandEncryptor::new(Some(PathBuf::from("/nonexistent/encryption-tool")));
        let result = encryptor.encrypt(Path::new("a"), Path::new("b"), "pw");
        assert!(matches!(
            result,
            Err(EngineError::EncryptionUnavailable { .. })
        ));
    }
}
