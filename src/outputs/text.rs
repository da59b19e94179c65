//! Plain-text export.
//!
//! Layout:
//!
//! ```text
//! ================================================================================
//! REDDIT POSTS EXPORT
//! ================================================================================
//! Subreddit: r/programming
//! Sort: Top | Time filter: week
//! Exported: 2025-05-06 09:30:00
//! Total posts: 5
//! ================================================================================
//!
//! 1. Title
//!    ...
//! --------------------------------------------------------------------------------
//! ================================================================================
//! End of export: 5 posts from r/programming
//! ================================================================================
//! ```

use crate::models::{ListingQuery, PostRecord};
use crate::utils::upcase;
use std::fmt::Write;

const HEAVY_RULE: &str = "================================================================================";
const LIGHT_RULE: &str = "--------------------------------------------------------------------------------";

/// Render the text export. `exported_at` is printed verbatim in the banner.
///
/// The banner describes `query`, so an empty listing still names what was
/// asked for.
pub fn render_text(query: &ListingQuery, records: &[PostRecord], exported_at: &str) -> String {
    let subreddit = format!("r/{}", query.subreddit);
    let sort = upcase(query.sort.as_str());
    let time = &query.time_filter;

    let mut out = String::new();
    let _ = writeln!(out, "{HEAVY_RULE}");
    let _ = writeln!(out, "REDDIT POSTS EXPORT");
    let _ = writeln!(out, "{HEAVY_RULE}");
    let _ = writeln!(out, "Subreddit: {subreddit}");
    let _ = writeln!(out, "Sort: {sort} | Time filter: {time}");
    let _ = writeln!(out, "Exported: {exported_at}");
    let _ = writeln!(out, "Total posts: {}", records.len());
    let _ = writeln!(out, "{HEAVY_RULE}");
    out.push('\n');

    for r in records {
        let _ = writeln!(out, "{}. {}", r.position, r.title);
        let _ = writeln!(out, "   Author: u/{}", r.author);
        let _ = writeln!(out, "   Score: {} | Comments: {}", r.score, r.num_comments);
        let _ = writeln!(out, "   Created: {}", r.created_at);
        let _ = writeln!(out, "   URL: {}", r.url);
        if !r.permalink.is_empty() {
            let _ = writeln!(out, "   Permalink: {}", r.permalink);
        }
        if let Some(body) = &r.selftext {
            for line in body.lines() {
                let _ = writeln!(out, "   | {line}");
            }
        }
        let _ = writeln!(out, "{LIGHT_RULE}");
    }

    let _ = writeln!(out, "{HEAVY_RULE}");
    let _ = writeln!(out, "End of export: {} posts from {subreddit}", records.len());
    let _ = writeln!(out, "{HEAVY_RULE}");
    out
}
