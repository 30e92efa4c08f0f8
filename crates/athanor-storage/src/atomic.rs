//! Atomic file replacement: temp file + fsync + rename.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::StorageError;

/// Atomically replace `path` with `content`.
///
/// The content is written to a temporary file in the target directory,
/// fsynced, and renamed over the target so readers never observe a
/// half-written file.
///
/// # Errors
///
/// Returns `StorageError::Io` on any filesystem failure.
pub fn write_file_atomic(path: &Path, content: &str) -> Result<(), StorageError> {
    let io_err = |source: std::io::Error| StorageError::Io {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let temp_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp_file = NamedTempFile::new_in(temp_dir).map_err(io_err)?;

    temp_file.write_all(content.as_bytes()).map_err(io_err)?;
    temp_file.as_file().sync_all().map_err(io_err)?;

    temp_file.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested").join("weights.json");

        write_file_atomic(&target, "{}").unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "{}");
    }

    #[test]
    fn write_replaces_existing_content() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("weights.json");

        write_file_atomic(&target, "old").unwrap();
        write_file_atomic(&target, "new").unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "new");
    }
}
