//! HTML fragment rendering.
//!
//! The fragment is self-contained (inline styles only) so it can be dropped
//! into the local web page or an email body unchanged. All post text is
//! escaped.

use crate::models::PostRecord;
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fmt::Write;

/// Render records as an ordered list.
pub fn render_html(records: &[PostRecord]) -> String {
    if records.is_empty() {
        return r#"<p class="no-posts">No posts found.</p>"#.to_string();
    }

    let mut out = String::new();
    out.push_str(r#"<ol class="reddit-posts" style="font-family: sans-serif; padding-left: 1.5em;">"#);
    out.push('\n');

    for r in records {
        let link = if r.permalink.is_empty() { &r.url } else { &r.permalink };
        let _ = writeln!(out, r#"  <li class="post" value="{}" style="margin-bottom: 1em;">"#, r.position);
        let _ = writeln!(
            out,
            r#"    <a href="{}" style="font-weight: bold; color: #1a0dab;">{}</a>"#,
            encode_double_quoted_attribute(link),
            encode_text(&r.title)
        );
        let _ = writeln!(
            out,
            r#"    <div class="meta" style="color: #666; font-size: 0.9em;">u/{} &middot; {} points &middot; {} comments &middot; {}</div>"#,
            encode_text(&r.author),
            r.score,
            r.num_comments,
            encode_text(&r.created_at)
        );
        if r.url != *link {
            let _ = writeln!(
                out,
                r#"    <div class="link"><a href="{}">{}</a></div>"#,
                encode_double_quoted_attribute(&r.url),
                encode_text(&r.url)
            );
        }
        if let Some(body) = &r.selftext {
            let _ = writeln!(
                out,
                r#"    <p class="selftext" style="white-space: pre-line;">{}</p>"#,
                encode_text(body)
            );
        }
        out.push_str("  </li>\n");
    }

    out.push_str("</ol>\n");
    out
}
