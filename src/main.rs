//! fdc - A per-file metadata cache for memoizing expensive file-derived computations
//!
//! fdc provides:
//! - Stable cache keys derived from a file's normalized path, mtime and size
//! - A corruption-safe one-record-per-file store with atomic replace
//! - Summary reporting and pruning of stale cache records

use anyhow::Result;
use clap::Parser;

mod cache;
mod cli;
mod flows;

fn main() -> Result<()> {
    // Check for unsupported platforms
    #[cfg(windows)]
    {
        eprintln!("Error: Windows is not supported. Please use WSL (not guaranteed to work).");
        std::process::exit(1);
    }

    let cli = cli::Cli::parse();
    cli::run(cli)
}
