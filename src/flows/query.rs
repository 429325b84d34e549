//! Query flows - get/put/add for a single file's metadata

use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::cache::key::Key;
use crate::cache::record::Metadata;
use crate::cache::store::FileCache;

/// Parse `KEY:VALUE` command-line arguments into metadata entries
fn parse_entries(args: &[String]) -> Result<Vec<(String, String)>> {
    let mut entries = Vec::with_capacity(args.len());
    for arg in args {
        match arg.split_once(':') {
            Some((k, v)) => entries.push((k.to_string(), v.to_string())),
            None => bail!("bad argument (expected KEY:VALUE): {}", arg),
        }
    }
    Ok(entries)
}

fn resolve(file: &Path) -> Result<Key> {
    Key::from_path(file).with_context(|| format!("cannot resolve {}", file.display()))
}

/// Run the get command: print the cached metadata for a file.
///
/// A miss (absent, stale or corrupt record) prints nothing; the exit
/// status is success either way.
pub fn run_get(cache: &FileCache, file: &Path) -> Result<()> {
    let key = resolve(file)?;

    if let Some(md) = cache.get(&key) {
        println!("Metadata entries: {}", md.len());
        for (k, v) in &md {
            println!("{}: {}", k, v);
        }
    }

    Ok(())
}

/// Run the put command: replace the file's cached metadata with the
/// given entries.
pub fn run_put(cache: &FileCache, file: &Path, args: &[String]) -> Result<()> {
    let key = resolve(file)?;

    let mut md = Metadata::new();
    for (k, v) in parse_entries(args)? {
        md.insert(k, v);
    }

    cache
        .put(&key, &md)
        .with_context(|| format!("cannot cache {}", key.path.display()))
}

/// Run the add command: merge the given entries over the existing
/// metadata (empty on a miss) and store the result.
pub fn run_add(cache: &FileCache, file: &Path, args: &[String]) -> Result<()> {
    let key = resolve(file)?;

    let mut md = cache.get(&key).unwrap_or_default();
    for (k, v) in parse_entries(args)? {
        md.insert(k, v);
    }

    cache
        .put(&key, &md)
        .with_context(|| format!("cannot cache {}", key.path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_parse_entries() {
        let args = vec!["len:8".to_string(), "C:JAM".to_string()];
        let entries = parse_entries(&args).unwrap();
        assert_eq!(
            entries,
            vec![
                ("len".to_string(), "8".to_string()),
                ("C".to_string(), "JAM".to_string())
            ]
        );
    }

    #[test]
    fn test_parse_entries_splits_on_first_colon() {
        let args = vec!["sha256:ab:cd".to_string()];
        let entries = parse_entries(&args).unwrap();
        assert_eq!(entries, vec![("sha256".to_string(), "ab:cd".to_string())]);
    }

    #[test]
    fn test_parse_entries_rejects_missing_colon() {
        let args = vec!["novalue".to_string()];
        assert!(parse_entries(&args).is_err());
    }

    #[test]
    fn test_put_then_add_merges() {
        let data = tempdir().unwrap();
        let root = tempdir().unwrap();
        let cache = FileCache::new(root.path());

        let file = data.path().join("f");
        fs::write(&file, "body").unwrap();

        run_put(&cache, &file, &["a:1".to_string()]).unwrap();
        run_add(&cache, &file, &["b:2".to_string()]).unwrap();

        let key = Key::from_path(&file).unwrap();
        let md = cache.get(&key).unwrap();
        assert_eq!(md.get("a").map(String::as_str), Some("1"));
        assert_eq!(md.get("b").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_add_overwrites_existing_key() {
        let data = tempdir().unwrap();
        let root = tempdir().unwrap();
        let cache = FileCache::new(root.path());

        let file = data.path().join("f");
        fs::write(&file, "body").unwrap();

        run_put(&cache, &file, &["a:1".to_string()]).unwrap();
        run_add(&cache, &file, &["a:2".to_string()]).unwrap();

        let key = Key::from_path(&file).unwrap();
        let md = cache.get(&key).unwrap();
        assert_eq!(md.get("a").map(String::as_str), Some("2"));
        assert_eq!(md.len(), 1);
    }

    #[test]
    fn test_put_replaces_whole_mapping() {
        let data = tempdir().unwrap();
        let root = tempdir().unwrap();
        let cache = FileCache::new(root.path());

        let file = data.path().join("f");
        fs::write(&file, "body").unwrap();

        run_put(&cache, &file, &["a:1".to_string(), "b:2".to_string()]).unwrap();
        run_put(&cache, &file, &["c:3".to_string()]).unwrap();

        let key = Key::from_path(&file).unwrap();
        let md = cache.get(&key).unwrap();
        assert_eq!(md.len(), 1);
        assert_eq!(md.get("c").map(String::as_str), Some("3"));
    }

    #[test]
    fn test_get_on_missing_source_is_an_error() {
        let root = tempdir().unwrap();
        let cache = FileCache::new(root.path());

        assert!(run_get(&cache, Path::new("/no/such/file")).is_err());
    }
}
