//! Atomic file replacement
//!
//! Writes go to a sibling temporary file which is renamed onto the
//! target in a single step, so a concurrent reader observes either the
//! old record or the new one, never a partial write. The temporary
//! file is removed on every early-exit path (drop-based cleanup).

use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Write `contents` to `path` via a sibling temp file and one atomic
/// rename. The target's parent directory must already exist.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.persist(path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_writes_contents() {
        let temp = tempdir().unwrap();
        let target = temp.path().join("out.txt");

        write_atomic(&target, b"hello").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"hello");
    }

    #[test]
    fn test_replaces_existing_file() {
        let temp = tempdir().unwrap();
        let target = temp.path().join("out.txt");
        fs::write(&target, "old").unwrap();

        write_atomic(&target, b"new").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"new");
    }

    #[test]
    fn test_missing_parent_directory_fails() {
        let temp = tempdir().unwrap();
        let target = temp.path().join("no/such/dir/out.txt");

        assert!(write_atomic(&target, b"x").is_err());
    }

    #[test]
    fn test_failed_replace_leaves_no_temp_file() {
        let temp = tempdir().unwrap();

        // Renaming a file over a non-empty directory fails
        let target = temp.path().join("occupied");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("inner"), "x").unwrap();

        assert!(write_atomic(&target, b"x").is_err());

        let stray: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(stray, vec![std::ffi::OsString::from("occupied")]);
    }
}
