//! Error types for the cache engine

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for key resolution and cache writes.
///
/// Reads never produce one of these: `FileCache::get` folds every
/// anomaly into a miss.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The source path does not exist
    #[error("no such file: {}", path.display())]
    NotFound {
        /// The path that was looked up
        path: PathBuf,
    },

    /// I/O failure during stat, directory creation, write, rename or
    /// mtime update
    #[error("{operation} failed for {}", path.display())]
    Io {
        /// Operation that failed (e.g. "stat", "write")
        operation: &'static str,
        /// Path that caused the error
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl CacheError {
    /// Create an I/O error with operation and path context
    pub fn io(operation: &'static str, path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
