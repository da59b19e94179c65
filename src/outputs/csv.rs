//! CSV export.
//!
//! One header row followed by one row per post. Fields containing a comma,
//! quote or line break are quoted, with embedded quotes doubled (RFC 4180).

use crate::models::PostRecord;
use std::fmt::Write;

pub const CSV_HEADER: &str = "Position,Title,Author,Score,Comments,URL,Created,Subreddit";

pub fn render_csv(records: &[PostRecord]) -> String {
    let mut out = String::new();
    out.push_str(CSV_HEADER);
    out.push('\n');

    for r in records {
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{}",
            r.position,
            csv_field(&r.title),
            csv_field(&r.author),
            r.score,
            r.num_comments,
            csv_field(&r.url),
            csv_field(&r.created_at),
            csv_field(&r.subreddit),
        );
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outputs::tests::sample_records;

    #[test]
    fn test_header_row() {
        let csv = render_csv(&[]);
        assert_eq!(csv, format!("{CSV_HEADER}\n"));
    }

    #[test]
    fn test_quoting() {
        let csv = render_csv(&sample_records());
        let first_row = csv.lines().nth(1).unwrap();
        assert!(first_row.starts_with("1,\"Rust 2.0, \"\"finally\"\"\",ferris,4200,321,"));
        assert!(first_row.ends_with(",2024-01-01 12:00:00 UTC,programming"));
    }

    #[test]
    fn test_csv_field() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("line\nbreak"), "\"line\nbreak\"");
    }
}
