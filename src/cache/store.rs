//! Cache store - one record file per cached path
//!
//! Maps a `Key` to its `Metadata` under a root directory. Reads fold
//! every anomaly (absent, stale, corrupt) into a miss so callers have
//! a single recovery path: recompute and put again. Writes go through
//! an atomic replace, then stamp the record file's mtime with the
//! source file's, which `get` re-checks as its fast staleness gate.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};

use filetime::FileTime;

use crate::cache::atomic::write_atomic;
use crate::cache::error::{CacheError, Result};
use crate::cache::key::Key;
use crate::cache::record::{self, Metadata};

/// Subdirectory of the cache root that holds record files
pub const RECORD_DIR: &str = "path";

/// Conventional cache root: the platform user cache directory plus a
/// fixed subdirectory. `None` when the platform defines no cache dir.
pub fn default_cache_root() -> Option<PathBuf> {
    dirs::cache_dir().map(|d| d.join("fdcache"))
}

/// Handle on a cache root directory.
///
/// Stateless beyond the root path; any number of handles may point at
/// the same root, in one process or many.
#[derive(Debug, Clone)]
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    /// Create a store over an explicit root directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileCache { root: root.into() }
    }

    /// The root directory this store was constructed with.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the record for a normalized key path:
    /// `<root>/path/<key path>`.
    pub fn record_path(&self, key_path: &Path) -> PathBuf {
        let mut p = self.root.join(RECORD_DIR);
        for comp in key_path.components() {
            if let Component::Normal(part) = comp {
                p.push(part);
            }
        }
        p
    }

    /// Fetch the metadata cached for a key, or `None` on a miss.
    ///
    /// A miss covers every anomaly: no record, an unreadable record,
    /// the record file's own mtime differing from `key.mod_time`, a
    /// bad header, a size mismatch or any malformed metadata line.
    pub fn get(&self, key: &Key) -> Option<Metadata> {
        let path = self.record_path(&key.path);

        // Fast staleness gate: put() stamped the record with the
        // source mtime, so any source change shows up here first.
        let meta = fs::metadata(&path).ok()?;
        if meta.modified().ok()? != key.mod_time {
            return None;
        }

        let file = File::open(&path).ok()?;
        record::parse(BufReader::new(file), key.size)
    }

    /// Store metadata for a key, replacing any existing record.
    ///
    /// The record becomes visible only through a single atomic rename;
    /// a failure at any step surfaces as [`CacheError::Io`] and leaves
    /// no partial record at the final path.
    pub fn put(&self, key: &Key, md: &Metadata) -> Result<()> {
        let path = self.record_path(&key.path);

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| CacheError::io("mkdir", dir, e))?;
        }

        let body = record::render(key.mod_time, key.size, md);
        write_atomic(&path, body.as_bytes()).map_err(|e| CacheError::io("write", &path, e))?;

        filetime::set_file_mtime(&path, FileTime::from_system_time(key.mod_time))
            .map_err(|e| CacheError::io("set mtime", &path, e))?;

        Ok(())
    }
}
