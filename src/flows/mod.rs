//! Flows module - CLI operations built on the cache engine
//!
//! Provides:
//! - query: get/put/add for a single file's metadata
//! - summary: cache-wide statistics and pruning of dead records

pub mod query;
pub mod summary;
