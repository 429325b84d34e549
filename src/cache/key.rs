//! Key resolution - identity and staleness fingerprint for a file
//!
//! A `Key` pins down which file a cache record belongs to (the
//! normalized absolute path) together with the stat fields that
//! invalidate the record when they change (mtime and size).

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use crate::cache::error::{CacheError, Result};

/// Identity of a cached file plus its staleness fingerprint.
///
/// Two keys address the same cache slot iff their normalized paths are
/// equal. A differing mtime or size on the same path invalidates the
/// stored record rather than addressing a new slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    /// Normalized absolute path, symlinks resolved
    pub path: PathBuf,
    /// Modification time at key construction
    pub mod_time: SystemTime,
    /// Size in bytes at key construction
    pub size: u64,
}

impl Key {
    /// Resolve a key for any path by stat-ing the live file.
    ///
    /// Fails with [`CacheError::NotFound`] when the path does not
    /// exist and [`CacheError::Io`] for any other stat or path
    /// resolution failure.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Key> {
        let path = path.as_ref();

        let meta = fs::metadata(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                CacheError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                CacheError::io("stat", path, e)
            }
        })?;

        let mod_time = meta
            .modified()
            .map_err(|e| CacheError::io("stat", path, e))?;

        Ok(Key {
            path: normalize_path(path)?,
            mod_time,
            size: meta.len(),
        })
    }
}

/// Normalize a path to its cache identity.
///
/// The path is made absolute and cleaned lexically (`.` and `..`
/// components resolved without touching the filesystem). Only when the
/// path itself is a symlink is it replaced by its fully resolved
/// target, so a link and its target share one cache slot.
pub fn normalize_path(path: &Path) -> Result<PathBuf> {
    let abs = std::path::absolute(path).map_err(|e| CacheError::io("resolve", path, e))?;
    let abs = clean(&abs);

    let meta = fs::symlink_metadata(&abs).map_err(|e| CacheError::io("lstat", &abs, e))?;
    if meta.file_type().is_symlink() {
        return fs::canonicalize(&abs).map_err(|e| CacheError::io("readlink", &abs, e));
    }

    Ok(abs)
}

/// Lexically clean an absolute path: `.` components are dropped and
/// `..` consumes the preceding component. `std::path::absolute` keeps
/// both, and the record layout needs one spelling per file.
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                // ".." directly under the root stays at the root
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
