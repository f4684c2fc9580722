use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Highest `_N` suffix tried before giving up on a file name.
const MAX_CONFLICT_SUFFIX: u32 = 1000;

/// Move a file from `src` to `dst`. Uses `rename` first (fast, atomic on same
/// filesystem). Falls back to copy + delete when rename fails, which covers
/// moves across devices.
fn move_file(src: &Path, dst: &Path) -> Result<(), StorageError> {
    if std::fs::rename(src, dst).is_ok() {
        return Ok(());
    }

    std::fs::copy(src, dst).map_err(|e| StorageError::MoveFile {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    })?;
    if let Err(e) = std::fs::remove_file(src) {
        // Do not leave two copies behind.
        let _ = std::fs::remove_file(dst);
        return Err(StorageError::MoveFile {
            from: src.to_path_buf(),
            to: dst.to_path_buf(),
            source: e,
        });
    }
    Ok(())
}

/// Splits `name.ext` into `("name", Some(".ext"))`.
fn split_extension(filename: &str) -> (&str, Option<&str>) {
    match filename.rfind('.') {
        Some(dot_pos) if dot_pos > 0 => (&filename[..dot_pos], Some(&filename[dot_pos..])),
        _ => (filename, None),
    }
}

fn numbered(filename: &str, counter: u32) -> String {
    if counter == 1 {
        return filename.to_string();
    }
    match split_extension(filename) {
        (base, Some(ext)) => format!("{}_{}{}", base, counter, ext),
        (base, None) => format!("{}_{}", base, counter),
    }
}

/// Filesystem primitives used by the router.
#[derive(Debug, Clone, Default)]
pub struct FileStorage;

impl FileStorage {
    pub fn new() -> Self {
        Self
    }

    /// Creates `path` and its parents. Succeeds if it already exists.
    pub fn ensure_directory(&self, path: &Path) -> Result<(), StorageError> {
        std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Moves `src` into `directory` as `filename`, appending `_2`, `_3`, ...
    /// when the name is taken.
    pub fn move_into(
        &self,
        src: &Path,
        directory: &Path,
        filename: &str,
    ) -> Result<PathBuf, StorageError> {
        self.ensure_directory(directory)?;
        let target = self.resolve_conflict(directory, filename)?;
        move_file(src, &target)?;
        Ok(target)
    }

    /// Copies `src` into `directory` as `filename`. The target is created
    /// exclusively, so concurrent writers never share a name.
    pub fn copy_into(
        &self,
        src: &Path,
        directory: &Path,
        filename: &str,
    ) -> Result<PathBuf, StorageError> {
        self.ensure_directory(directory)?;

        let mut source = File::open(src).map_err(|e| StorageError::CopyFile {
            from: src.to_path_buf(),
            to: directory.join(filename),
            source: e,
        })?;

        for counter in 1..=MAX_CONFLICT_SUFFIX {
            let try_path = directory.join(numbered(filename, counter));

            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&try_path)
            {
                Ok(mut target) => {
                    if let Err(e) = std::io::copy(&mut source, &mut target) {
                        drop(target);
                        let _ = std::fs::remove_file(&try_path);
                        return Err(StorageError::CopyFile {
                            from: src.to_path_buf(),
                            to: try_path,
                            source: e,
                        });
                    }
                    return Ok(try_path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(StorageError::CopyFile {
                        from: src.to_path_buf(),
                        to: try_path,
                        source: e,
                    });
                }
            }
        }

        Err(StorageError::FileExists(directory.join(filename)))
    }

    /// Returns a free path for `filename` inside `directory`.
    pub fn resolve_conflict(
        &self,
        directory: &Path,
        filename: &str,
    ) -> Result<PathBuf, StorageError> {
        // symlink_metadata also catches broken symlinks
        for counter in 1..=MAX_CONFLICT_SUFFIX {
            let candidate = directory.join(numbered(filename, counter));
            if std::fs::symlink_metadata(&candidate).is_err() {
                return Ok(candidate);
            }
        }

        Err(StorageError::FileExists(directory.join(filename)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_move_into_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("order.pdf");
        std::fs::write(&source, b"content").unwrap();
        let target_dir = temp_dir.path().join("errors/blocked");

        let moved = FileStorage::new()
            .move_into(&source, &target_dir, "0001_order.pdf")
            .unwrap();

        assert!(!source.exists());
        assert_eq!(moved, target_dir.join("0001_order.pdf"));
        assert_eq!(std::fs::read(&moved).unwrap(), b"content");
    }

    #[test]
    fn test_move_into_conflict_resolution() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new();
        let target_dir = temp_dir.path().join("out");

        for i in 1..=3 {
            let source = temp_dir.path().join(format!("src{}.pdf", i));
            std::fs::write(&source, format!("content {}", i)).unwrap();
            storage.move_into(&source, &target_dir, "document.pdf").unwrap();
        }

        assert!(target_dir.join("document.pdf").exists());
        assert!(target_dir.join("document_2.pdf").exists());
        assert!(target_dir.join("document_3.pdf").exists());
    }

    #[test]
    fn test_move_missing_source_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = FileStorage::new().move_into(
            &temp_dir.path().join("nonexistent.pdf"),
            temp_dir.path(),
            "target.pdf",
        );

        match result {
            Err(StorageError::MoveFile { from, .. }) => {
                assert!(from.to_string_lossy().contains("nonexistent.pdf"));
            }
            other => panic!("Expected MoveFile error, got {:?}", other),
        }
    }

    #[test]
    fn test_copy_into_keeps_source() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("order.pdf");
        std::fs::write(&source, b"original").unwrap();
        let storage = FileStorage::new();
        let archive = temp_dir.path().join("originals");

        let first = storage.copy_into(&source, &archive, "order.pdf").unwrap();
        let second = storage.copy_into(&source, &archive, "order.pdf").unwrap();

        assert!(source.exists());
        assert!(first.ends_with("order.pdf"));
        assert!(second.ends_with("order_2.pdf"));
        assert_eq!(std::fs::read(&second).unwrap(), b"original");
    }

    #[test]
    fn test_copy_missing_source_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = FileStorage::new().copy_into(
            &temp_dir.path().join("missing.pdf"),
            temp_dir.path(),
            "x.pdf",
        );
        assert!(matches!(result, Err(StorageError::CopyFile { .. })));
    }

    #[test]
    fn test_conflict_resolution_no_extension() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("noext"), b"original").unwrap();

        let resolved = FileStorage::new()
            .resolve_conflict(temp_dir.path(), "noext")
            .unwrap();

        assert!(resolved.ends_with("noext_2"));
    }

    #[test]
    fn test_ensure_directory_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new();
        let nested = temp_dir.path().join("deep/nested/directory");

        storage.ensure_directory(&nested).unwrap();
        storage.ensure_directory(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("a.pdf"), ("a", Some(".pdf")));
        assert_eq!(split_extension(".hidden"), (".hidden", None));
        assert_eq!(numbered("0001_a.pdf", 3), "0001_a_3.pdf");
    }
}
