//! Summary flow - cache-wide statistics and pruning
//!
//! Walks every record file under `<root>/path` with a bounded worker
//! pool. Each worker re-resolves the record's source file and replays
//! the normal staleness checks; records that no longer serve a get are
//! deleted. Workers feed a single aggregating consumer over a channel,
//! so per-file statistics never live in shared mutable counters.

use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use walkdir::WalkDir;

use crate::cache::key::Key;
use crate::cache::store::{FileCache, RECORD_DIR};

/// Default number of concurrent scan workers
pub const DEFAULT_WORKERS: usize = 32;

/// Histogram bucket count for the size report
const SIZE_BUCKETS: u64 = 8;

/// Maximum width of a histogram bar in columns
const BAR_WIDTH: u64 = 40;

/// Aggregated results of a cache scan
#[derive(Debug, Default, Serialize)]
pub struct ScanStats {
    /// Number of valid records
    pub files: u64,
    /// Number of records deleted during the scan
    pub pruned: u64,
    /// Count of valid records per source file size
    pub sizes: BTreeMap<u64, u64>,
    /// Count of valid records per number of metadata entries
    pub entry_counts: BTreeMap<usize, u64>,
}

/// Summary output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummaryFormat {
    /// Human-readable text report
    #[default]
    Text,
    /// JSON object with the full statistics
    Json,
}

impl std::str::FromStr for SummaryFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(SummaryFormat::Text),
            "json" => Ok(SummaryFormat::Json),
            _ => Err(format!("Unknown summary format: {}", s)),
        }
    }
}

enum ScanEvent {
    Valid { size: u64, entries: usize },
    Pruned,
}

/// Map a record file back to the source path it caches
fn source_path(record_root: &Path, record: &Path) -> Option<PathBuf> {
    let rel = record.strip_prefix(record_root).ok()?;
    Some(Path::new("/").join(rel))
}

/// Re-validate one record, deleting it when it no longer serves a get
fn scan_record(
    cache: &FileCache,
    record_root: &Path,
    record: &Path,
    tx: &mpsc::Sender<ScanEvent>,
) {
    let valid = source_path(record_root, record)
        .and_then(|src| Key::from_path(&src).ok())
        .and_then(|key| cache.get(&key).map(|md| (key.size, md.len())));

    let event = match valid {
        Some((size, entries)) => ScanEvent::Valid { size, entries },
        None => {
            let _ = fs::remove_file(record);
            ScanEvent::Pruned
        }
    };

    let _ = tx.send(event);
}

/// Walk the cache tree, validating every record with `workers`
/// concurrent checkers and pruning records that fail.
pub fn scan_cache(cache: &FileCache, workers: usize) -> Result<ScanStats> {
    let record_root = cache.root().join(RECORD_DIR);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .context("cannot build scan worker pool")?;

    let (tx, rx) = mpsc::channel();

    // The only place statistics are accumulated
    let consumer = thread::spawn(move || {
        let mut stats = ScanStats::default();
        for event in rx {
            match event {
                ScanEvent::Valid { size, entries } => {
                    stats.files += 1;
                    *stats.sizes.entry(size).or_insert(0) += 1;
                    *stats.entry_counts.entry(entries).or_insert(0) += 1;
                }
                ScanEvent::Pruned => stats.pruned += 1,
            }
        }
        stats
    });

    // scope() is the completion barrier: it returns only after every
    // spawned worker has finished.
    pool.scope(|s| {
        for entry in WalkDir::new(&record_root).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let record = entry.into_path();
            let tx = tx.clone();
            let record_root = &record_root;
            s.spawn(move |_| scan_record(cache, record_root, &record, &tx));
        }
    });

    drop(tx);
    consumer.join().map_err(|_| anyhow!("scan consumer panicked"))
}

/// One row of the size histogram
struct Bucket {
    lo: u64,
    hi: u64,
    count: u64,
}

/// Bucket the observed sizes into up to `SIZE_BUCKETS` equal-width
/// ranges. Collapses to one bucket when all sizes are equal.
fn size_buckets(sizes: &BTreeMap<u64, u64>) -> Vec<Bucket> {
    let (Some(&min), Some(&max)) = (sizes.keys().next(), sizes.keys().next_back()) else {
        return Vec::new();
    };

    if min == max {
        let count = sizes.values().sum();
        return vec![Bucket {
            lo: min,
            hi: max,
            count,
        }];
    }

    let width = ((max - min) / SIZE_BUCKETS).max(1);
    let mut buckets: Vec<Bucket> = (0..SIZE_BUCKETS)
        .map(|i| Bucket {
            lo: min + i * width,
            hi: min + (i + 1) * width,
            count: 0,
        })
        .collect();
    if let Some(last) = buckets.last_mut() {
        // The top bucket absorbs the rounding remainder
        last.hi = max;
    }

    for (&size, &count) in sizes {
        let idx = ((size - min) / width).min(SIZE_BUCKETS - 1) as usize;
        buckets[idx].count += count;
    }

    buckets
}

fn bar(count: u64, max_count: u64) -> String {
    "#".repeat((count * BAR_WIDTH / max_count.max(1)) as usize)
}

fn print_text(stats: &ScanStats) {
    println!("{}", "Data for file sizes:".bold());
    let buckets = size_buckets(&stats.sizes);
    let key_width = buckets.last().map_or(1, |b| b.hi.to_string().len());
    let max_count = buckets.iter().map(|b| b.count).max().unwrap_or(0);
    let count_width = max_count.to_string().len();
    for b in &buckets {
        println!(
            "{:>kw$}-{:>kw$}: {:>cw$} {}",
            b.lo,
            b.hi,
            b.count,
            bar(b.count, max_count),
            kw = key_width,
            cw = count_width
        );
    }

    println!("{}", "Data for number of metadata entries:".bold());
    for (entries, count) in &stats.entry_counts {
        println!("{}: {}", entries, count);
    }

    println!("Number of files in cache: {}", stats.files);
    println!("Number of files pruned: {}", stats.pruned);
}

/// Run the summary command: scan, report, prune.
pub fn run_summary(cache: &FileCache, workers: usize, format: SummaryFormat) -> Result<()> {
    let stats = scan_cache(cache, workers)?;

    match format {
        SummaryFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        SummaryFormat::Text => print_text(&stats),
    }

    Ok(())
}
