//! Cache record wire format
//!
//! A record is a newline-terminated UTF-8 text file:
//!
//! ```text
//! filedatacache-1.0
//! mtime: <int>[.<9-digit fraction>]
//! size: <int>
//! <key1>: <value1>
//! <key2>: <value2>
//! ```
//!
//! Records are all-or-nothing: any malformed line makes the whole
//! record invalid on read.

use std::collections::BTreeMap;
use std::io::BufRead;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Metadata cached for a file: flat string keys to string values,
/// iterated in key order.
pub type Metadata = BTreeMap<String, String>;

/// Version tag on the first line of every record
pub const FORMAT_TAG: &str = "filedatacache-1.0";

/// Separator between key and value on metadata lines
const SEPARATOR: &str = ": ";

/// Encode a timestamp as Unix seconds, appending a nine-digit
/// fractional suffix only when the sub-second component is non-zero.
/// Pre-epoch timestamps clamp to `0`.
pub fn encode_mtime(t: SystemTime) -> String {
    let d = t.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
    if d.subsec_nanos() == 0 {
        format!("{}", d.as_secs())
    } else {
        format!("{}.{:09}", d.as_secs(), d.subsec_nanos())
    }
}

/// Render the full record body for a slot.
///
/// Entries are written in sorted key order, so identical metadata
/// always produces a byte-identical record.
pub fn render(mod_time: SystemTime, size: u64, md: &Metadata) -> String {
    let mut out = format!("{}\nmtime: {}\nsize: {}\n", FORMAT_TAG, encode_mtime(mod_time), size);
    for (k, v) in md {
        out.push_str(k);
        out.push_str(SEPARATOR);
        out.push_str(v);
        out.push('\n');
    }
    out
}

/// Parse a record, validating the header against the expected source
/// size.
///
/// Returns `None` for any structural problem: wrong or missing tag,
/// missing or malformed `mtime:` line, an unparsable or mismatched
/// `size:` line, or a metadata line without the `": "` separator. The
/// `mtime:` value is only shape-checked; staleness is enforced by the
/// record file's own filesystem mtime before parsing begins.
pub fn parse(reader: impl BufRead, expect_size: u64) -> Option<Metadata> {
    let mut lines = reader.lines();

    if lines.next()?.ok()? != FORMAT_TAG {
        return None;
    }

    let mtime_line = lines.next()?.ok()?;
    if !mtime_line.starts_with("mtime: ") {
        return None;
    }

    let size_line = lines.next()?.ok()?;
    let size: u64 = size_line.strip_prefix("size: ")?.parse().ok()?;
    if size != expect_size {
        return None;
    }

    let mut md = Metadata::new();
    for line in lines {
        let line = line.ok()?;
        let (k, v) = line.split_once(SEPARATOR)?;
        md.insert(k.to_string(), v.to_string());
    }

    Some(md)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_metadata() -> Metadata {
        let mut md = Metadata::new();
        md.insert("len".to_string(), "8".to_string());
        md.insert("C".to_string(), "JAM".to_string());
        md
    }

    #[test]
    fn test_encode_mtime_whole_seconds() {
        let t = UNIX_EPOCH + Duration::from_secs(1500000000);
        assert_eq!(encode_mtime(t), "1500000000");
    }

    #[test]
    fn test_encode_mtime_subsecond() {
        let t = UNIX_EPOCH + Duration::new(1500000000, 42);
        assert_eq!(encode_mtime(t), "1500000000.000000042");
    }

    #[test]
    fn test_encode_mtime_pre_epoch_clamps() {
        let t = UNIX_EPOCH - Duration::from_secs(60);
        assert_eq!(encode_mtime(t), "0");
    }

    #[test]
    fn test_render_sorted_keys() {
        let t = UNIX_EPOCH + Duration::from_secs(100);
        let body = render(t, 5, &sample_metadata());
        assert_eq!(
            body,
            "filedatacache-1.0\nmtime: 100\nsize: 5\nC: JAM\nlen: 8\n"
        );
    }

    #[test]
    fn test_render_is_deterministic() {
        let t = UNIX_EPOCH + Duration::new(100, 7);
        let a = render(t, 5, &sample_metadata());
        let b = render(t, 5, &sample_metadata());
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_round_trip() {
        let t = UNIX_EPOCH + Duration::from_secs(100);
        let md = sample_metadata();
        let body = render(t, 5, &md);

        let parsed = parse(Cursor::new(body), 5).unwrap();
        assert_eq!(parsed, md);
    }

    #[test]
    fn test_parse_empty_metadata_is_valid() {
        let body = "filedatacache-1.0\nmtime: 100\nsize: 5\n";
        let parsed = parse(Cursor::new(body), 5).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_parse_rejects_wrong_tag() {
        let body = "filedatacache-2.0\nmtime: 100\nsize: 5\n";
        assert!(parse(Cursor::new(body), 5).is_none());
    }

    #[test]
    fn test_parse_rejects_empty_input() {
        assert!(parse(Cursor::new(""), 5).is_none());
    }

    #[test]
    fn test_parse_rejects_tag_only() {
        assert!(parse(Cursor::new("filedatacache-1.0\n"), 5).is_none());
    }

    #[test]
    fn test_parse_rejects_malformed_mtime_line() {
        let body = "filedatacache-1.0\nmodified: 100\nsize: 5\n";
        assert!(parse(Cursor::new(body), 5).is_none());
    }

    #[test]
    fn test_parse_rejects_size_mismatch() {
        let body = "filedatacache-1.0\nmtime: 100\nsize: 5\n";
        assert!(parse(Cursor::new(body), 6).is_none());
    }

    #[test]
    fn test_parse_rejects_unparsable_size() {
        let body = "filedatacache-1.0\nmtime: 100\nsize: five\n";
        assert!(parse(Cursor::new(body), 5).is_none());
    }

    #[test]
    fn test_parse_rejects_line_without_separator() {
        // One bad line poisons the whole record, not just that entry
        let body = "filedatacache-1.0\nmtime: 100\nsize: 5\ngood: yes\nbadline\n";
        assert!(parse(Cursor::new(body), 5).is_none());
    }

    #[test]
    fn test_parse_splits_on_first_separator_only() {
        let body = "filedatacache-1.0\nmtime: 100\nsize: 5\nurl: http://x: 80\n";
        let parsed = parse(Cursor::new(body), 5).unwrap();
        assert_eq!(parsed.get("url").map(String::as_str), Some("http://x: 80"));
    }
}
