//! Filesystem operations module.
//!
//! This module provides low-level operations for:
//! - Enumerating source trees into flat file lists
//! - Copying files with metadata preservation
//! - Creating directories recursively

use crate::error::EngineError;
use crate::model::FileEntry;
use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// Enumerate every file under `source` recursively.
///
/// Directories are walked but not returned as entries; each file carries
/// its path relative to `source`, its byte size and its modification
/// time, which is what the strategies select on.
///
/// # Errors
/// Returns EngineError if a directory cannot be read.
pub fn enumerate_files(source: &Path) -> Result<Vec<FileEntry>, EngineError> {
    let mut entries = Vec::new();

    fn recurse(
        dir: &Path,
        rel_path: &Path,
        entries: &mut Vec<FileEntry>,
    ) -> Result<(), EngineError> {
        let read_dir = fs::read_dir(dir).map_err(|e| EngineError::Enumeration {
            path: dir.to_path_buf(),
            source: e,
        })?;

        for entry in read_dir {
            let entry = entry.map_err(|e| EngineError::Enumeration {
                path: dir.to_path_buf(),
                source: e,
            })?;
            let metadata = entry.metadata().map_err(|e| EngineError::Enumeration {
                path: entry.path(),
                source: e,
            })?;

            let rel_full_path = rel_path.join(entry.file_name());

            if metadata.is_dir() {
                recurse(&entry.path(), &rel_full_path, entries)?;
            } else if metadata.is_file() {
                let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                entries.push(FileEntry {
                    source_path: entry.path(),
                    relative_path: rel_full_path,
                    size: metadata.len(),
                    modified,
                });
            }
            // Symlinks and other special files are not backed up.
        }
        Ok(())
    }

    recurse(source, Path::new(""), &mut entries)?;
    Ok(entries)
}

/// Copy a file byte-for-byte, overwriting any existing target.
///
/// The source modification time is carried over to the destination when
/// it can be read.
///
/// # Returns
/// Number of bytes copied
pub fn copy_file_with_metadata(src: &Path, dst: &Path) -> Result<u64, EngineError> {
    let mut src_file = fs::File::open(src).map_err(|e| EngineError::CopyFailed {
        path: src.to_path_buf(),
        source: e,
    })?;

    let src_mtime = src_file.metadata().ok().and_then(|m| m.modified().ok());

    let mut dst_file = fs::File::create(dst).map_err(|e| EngineError::CopyFailed {
        path: dst.to_path_buf(),
        source: e,
    })?;

    let bytes_copied = io::copy(&mut src_file, &mut dst_file).map_err(|e| {
        EngineError::CopyFailed {
            path: src.to_path_buf(),
            source: e,
        }
    })?;

    if let Some(mtime) = src_mtime {
        let _ = filetime::set_file_mtime(dst, filetime::FileTime::from_system_time(mtime));
    }

    Ok(bytes_copied)
}

/// Ensure the parent directory of a path exists, creating it if necessary.
pub fn ensure_parent_dir_exists(path: &Path) -> Result<(), EngineError> {
    if let Some(parent) = path.parent() {
        if parent.as_os_str().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(parent).map_err(|e| EngineError::DirectoryCreation {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_enumerate_flat_directory() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        fs::create_dir(&src).expect("Failed to create src dir");

        fs::write(src.join("file1.txt"), b"test data 1").expect("Failed to write file1");
        fs::write(src.join("file2.txt"), b"test data 2").expect("Failed to write file2");

        let entries = enumerate_files(&src).expect("Failed to enumerate");

        assert_eq!(entries.len(), 2);
        let total_size: u64 = entries.iter().map(|e| e.size).sum();
        assert_eq!(total_size, 22);
    }

    #[test]
    fn test_enumerate_nested_directory_keeps_relative_paths() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        fs::create_dir_all(src.join("sub/deep")).expect("Failed to create tree");

        fs::write(src.join("top.txt"), b"top").expect("write");
        fs::write(src.join("sub/deep/leaf.txt"), b"leaf").expect("write");

        let mut entries = enumerate_files(&src).expect("Failed to enumerate");
        entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        // Directories themselves are not entries, only their files.
        let rels: Vec<_> = entries.iter().map(|e| e.relative_path.clone()).collect();
        assert_eq!(
            rels,
            vec![
                std::path::PathBuf::from("sub/deep/leaf.txt"),
                std::path::PathBuf::from("top.txt"),
            ]
        );
    }

    #[test]
    fn test_enumerate_captures_modification_time() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src = temp_dir.path().join("src");
        fs::create_dir(&src).expect("Failed to create src dir");
        fs::write(src.join("a.txt"), b"a").expect("write");

        let old = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000_000);
        filetime::set_file_mtime(
            src.join("a.txt"),
            filetime::FileTime::from_system_time(old),
        )
        .expect("set mtime");

        let entries = enumerate_files(&src).expect("Failed to enumerate");
        assert_eq!(entries[0].modified, old);
    }

    #[test]
    fn test_enumerate_nonexistent_source() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let result = enumerate_files(&temp_dir.path().join("nonexistent"));
        assert!(result.is_err());
    }

    #[test]
    fn test_copy_file_overwrites_and_preserves_content() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let src_file = temp_dir.path().join("source.txt");
        let dst_file = temp_dir.path().join("dest.txt");

        let mut file = fs::File::create(&src_file).expect("Failed to create source");
        file.write_all(b"test content").expect("Failed to write source");
        drop(file);

        fs::write(&dst_file, b"stale").expect("Failed to seed dest");

        let bytes = copy_file_with_metadata(&src_file, &dst_file).expect("Failed to copy");
        assert_eq!(bytes, 12);
        assert_eq!(fs::read_to_string(&dst_file).expect("read"), "test content");
    }

    #[test]
    fn test_ensure_parent_dir_exists() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("a/b/c/file.txt");

        ensure_parent_dir_exists(&path).expect("Failed to create parent");
        assert!(path.parent().unwrap().exists());

        // Idempotent on an existing parent.
        ensure_parent_dir_exists(&path).expect("Second call should succeed");
    }
}
