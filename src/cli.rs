//! CLI module - Command-line interface definitions and handlers

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::cache::store::{default_cache_root, FileCache};
use crate::flows::query;
use crate::flows::summary::{self, SummaryFormat, DEFAULT_WORKERS};

/// fdc - a per-file metadata cache for memoizing file-derived computations.
#[derive(Parser, Debug)]
#[command(name = "fdc")]
#[command(
    author,
    version,
    about,
    long_about = r#"fdc caches a flat KEY:VALUE metadata mapping per file, keyed by the
file's normalized path, modification time and size. As soon as the file
changes, its cached metadata stops being served; whatever tool feeds
the cache recomputes and stores it again.

Typical use is memoizing expensive file-derived data (checksums,
parsed headers, extracted tags).

Examples:
    fdc put big.iso sha256:4ec9599fc203d176a301536c2e091a19bc852759b255bd6818810a42c5fed14a
    fdc get big.iso
    fdc add big.iso width:1024 height:768
    fdc summary
"#
)]
pub struct Cli {
    /// Cache root directory.
    #[arg(
        long,
        global = true,
        env = "FDC_CACHE_ROOT",
        value_name = "PATH",
        long_help = "Cache root directory holding all record files.\n\n\
Defaults to the platform user cache directory plus \"fdcache\"\n\
(e.g. ~/.cache/fdcache on Linux). May also be set through the\n\
FDC_CACHE_ROOT environment variable."
    )]
    pub cache_root: Option<PathBuf>,

    /// Disable colored output (when applicable).
    #[arg(
        long,
        global = true,
        long_help = "Disable colored output. This is useful when piping to files or when your\n\
terminal does not support ANSI colors."
    )]
    pub no_color: bool,

    /// Verbose mode (more diagnostics).
    #[arg(
        short,
        long,
        global = true,
        long_help = "Enable more detailed diagnostics. This is intended for debugging and\n\
may increase stderr output."
    )]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the cached metadata for a file.
    #[command(
        long_about = "Resolve FILE to its cache key (normalized path + mtime + size) and\n\
print the stored metadata, one `key: value` line per entry in sorted\n\
key order, preceded by the entry count.\n\n\
A stale, corrupt or absent record prints nothing: every anomaly is a\n\
cache miss.\n\n\
Examples:\n\
  fdc get src/main.rs\n"
    )]
    Get {
        /// File whose metadata to look up.
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Replace the cached metadata for a file.
    #[command(
        long_about = "Resolve FILE to its cache key and store the given entries as its\n\
complete metadata, replacing any previous record atomically.\n\n\
Each entry splits on the first `:`; the value may contain further\n\
colons.\n\n\
Examples:\n\
  fdc put report.pdf pages:42 title:Q3\n"
    )]
    Put {
        /// File whose metadata to store.
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Metadata entries to store.
        #[arg(value_name = "KEY:VALUE", num_args = 0..)]
        entries: Vec<String>,
    },

    /// Merge entries into the cached metadata for a file.
    #[command(
        long_about = "Like put, but the given entries are merged over the existing\n\
metadata (treated as empty when the record is stale or absent) instead\n\
of replacing it.\n\n\
Examples:\n\
  fdc add report.pdf author:me\n"
    )]
    Add {
        /// File whose metadata to extend.
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Metadata entries to merge.
        #[arg(value_name = "KEY:VALUE", num_args = 0..)]
        entries: Vec<String>,
    },

    /// Report cache statistics and prune dead records.
    #[command(
        alias = "sum",
        long_about = "Walk every record under the cache root with a bounded worker pool.\n\
Records whose source file is gone, changed or whose record is corrupt\n\
are deleted. Valid records feed a report: a histogram of source file\n\
sizes, the distribution of metadata entry counts, and totals.\n\n\
Examples:\n\
  fdc summary\n\
  fdc summary --workers 8 --summary-format json\n"
    )]
    Summary {
        /// Number of concurrent scan workers.
        #[arg(long, default_value_t = DEFAULT_WORKERS, value_name = "N")]
        workers: usize,

        /// Output format (text/json).
        #[arg(
            long = "summary-format",
            default_value = "text",
            value_name = "FORMAT",
            long_help = "Select the output format for the summary report.\n\n\
Supported values:\n\
- text (default): human-readable histogram and totals\n\
- json: full statistics as a JSON object"
        )]
        summary_format: String,
    },
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    if cli.no_color {
        colored::control::set_override(false);
    }

    let root = cli
        .cache_root
        .or_else(default_cache_root)
        .context("cannot determine a cache directory for this platform")?;
    let cache = FileCache::new(root);

    match cli.command {
        Commands::Get { file } => query::run_get(&cache, &file),

        Commands::Put { file, entries } => query::run_put(&cache, &file, &entries),

        Commands::Add { file, entries } => query::run_add(&cache, &file, &entries),

        Commands::Summary {
            workers,
            summary_format,
        } => {
            let format: SummaryFormat = summary_format.parse().map_err(|e: String| anyhow!(e))?;
            if cli.verbose {
                eprintln!(
                    "scanning {} with {} workers",
                    cache.root().display(),
                    workers
                );
            }
            summary::run_summary(&cache, workers, format)
        }
    }
}
