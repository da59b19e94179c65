//! Utility functions for timestamps, string manipulation, and file system operations.
//!
//! This module provides helper functions used throughout the application:
//! - Epoch-second formatting for post timestamps
//! - String truncation for logging and self-text previews
//! - Slugification for export file names
//! - File system validation for export directories
//! - Handing URLs to the desktop browser

use chrono::DateTime;
use std::error::Error;
use std::path::Path;
use std::process::{Command, Stdio};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// Scratch file written and removed by [`ensure_writable_dir`].
const WRITE_CHECK_FILE: &str = ".subreddit_digest_write_check";

/// Format Unix epoch seconds as `YYYY-MM-DD HH:MM:SS UTC`.
///
/// Fractional seconds are dropped. Values outside chrono's range fall back
/// to `"Unknown"`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(format_epoch(0.0), "1970-01-01 00:00:00 UTC");
/// ```
pub fn format_epoch(secs: f64) -> String {
    if !secs.is_finite() {
        return "Unknown".to_string();
    }
    DateTime::from_timestamp(secs.trunc() as i64, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to at most `max` bytes (backing off to a char
/// boundary) with an ellipsis and byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Keep the first `max_chars` characters of `s`, appending `...` when cut.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        None => s.to_string(),
        Some((idx, _)) => format!("{}...", s[..idx].trim_end()),
    }
}

/// Whether a listing body failed to parse because it ended early.
///
/// A body cut off mid-transfer is reported differently from one that parsed
/// but had the wrong shape.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    e.is_eof()
}

/// Convert text to a file-name-friendly slug.
///
/// Lowercases, drops everything except alphanumerics, spaces, `-`, `_` and
/// `+`, then replaces spaces with hyphens.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slugify("Hello World"), "hello-world");
/// ```
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .replace(
            |c: char| !c.is_alphanumeric() && !matches!(c, ' ' | '-' | '_' | '+'),
            "",
        )
        .replace(' ', "-")
}

/// Title-case a sort name for display: `top` becomes `Top`.
pub fn upcase(s: &str) -> String {
    let mut chars = s.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

/// Create the export directory if needed and check that files can be
/// written into it.
///
/// The check writes an empty scratch file and removes it again. A scratch
/// file that cannot be removed is logged and left behind; the directory is
/// still reported writable.
///
/// # Errors
///
/// Fails when the directory cannot be created or the scratch file cannot be
/// written.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let scratch = Path::new(path).join(WRITE_CHECK_FILE);
    fs::write(&scratch, b"").await?;
    if let Err(e) = fs::remove_file(&scratch).await {
        warn!(file = %scratch.display(), error = %e, "Could not remove write-check file");
    }
    info!("Export directory is writable");
    Ok(())
}

/// Open `url` in the system browser.
///
/// Spawns the platform opener (`open`, `cmd /C start` or `xdg-open`) and
/// returns without waiting for it.
pub fn open_in_browser(url: &str) -> std::io::Result<()> {
    let mut cmd = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else {
        Command::new("xdg-open")
    };
    cmd.arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    debug!(%url, "Opened in browser");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_epoch() {
        assert_eq!(format_epoch(0.0), "1970-01-01 00:00:00 UTC");
        assert_eq!(format_epoch(1_640_995_200.9), "2022-01-01 00:00:00 UTC");
        assert_eq!(format_epoch(f64::NAN), "Unknown");
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        let s = "é".repeat(10);
        let result = truncate_for_log(&s, 3);
        assert!(result.starts_with('é'));
        assert!(result.contains("(+18 bytes)"));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("exactly", 7), "exactly");
        assert_eq!(truncate_chars("hello world", 6), "hello...");
        assert_eq!(truncate_chars("ééééé", 2), "éé...");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("rust+programming"), "rust+programming");
        assert_eq!(slugify("Special@#$Characters"), "specialcharacters");
        assert_eq!(slugify("2024-01-01 12:30"), "2024-01-01-1230");
    }

    #[test]
    fn test_upcase() {
        assert_eq!(upcase("controversial"), "Controversial");
        assert_eq!(upcase(""), "");
        assert_eq!(upcase("a"), "A");
        assert_eq!(upcase("ßx"), "SSx");
    }

    #[test]
    fn test_looks_truncated() {
        let json_eof = r#"{"field": "value"#;
        let err = serde_json::from_str::<serde_json::Value>(json_eof).unwrap_err();
        assert!(looks_truncated(&err));

        let wrong_shape = serde_json::from_str::<Vec<u8>>(r#"{"a": 1}"#).unwrap_err();
        assert!(!looks_truncated(&wrong_shape));
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_missing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("exports/nested");
        let nested = nested.to_str().unwrap();
        ensure_writable_dir(nested).await.unwrap();
        assert!(std::path::Path::new(nested).is_dir());
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_leaves_no_scratch_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_str().unwrap();
        ensure_writable_dir(dir).await.unwrap();
        ensure_writable_dir(&format!("{dir}/")).await.unwrap();

        assert!(!tmp.path().join(WRITE_CHECK_FILE).exists());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }
}
