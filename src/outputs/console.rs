//! Terminal listing.

use crate::models::PostRecord;
use std::fmt::Write;

/// Render records for a terminal, one numbered block per post.
pub fn render_console(records: &[PostRecord]) -> String {
    if records.is_empty() {
        return "No posts found.\n".to_string();
    }

    let mut out = String::new();
    for r in records {
        let _ = writeln!(out, "#{:<3} {}", r.position, r.title);
        let _ = writeln!(
            out,
            "     u/{} | {} points | {} comments | {}",
            r.author, r.score, r.num_comments, r.created_at
        );
        let _ = writeln!(out, "     {}", r.url);
        if !r.permalink.is_empty() && r.permalink != r.url {
            let _ = writeln!(out, "     {}", r.permalink);
        }
        out.push('\n');
    }
    out
}
