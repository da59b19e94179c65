//! Digest email composition.
//!
//! A digest carries a plain-text body and an HTML alternative built from the
//! same records. Delivery lives in [`crate::mailer`].

use crate::models::{PostRecord, Subscription};
use crate::outputs::{console::render_console, html::render_html};
use crate::utils::upcase;
use html_escape::encode_text;
use std::fmt::Write;

/// A composed digest ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestEmail {
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

/// Compose the digest for `subscription` from freshly fetched `records`.
///
/// `generated_at` is printed in both bodies.
pub fn compose_digest(
    subscription: &Subscription,
    records: &[PostRecord],
    generated_at: &str,
) -> DigestEmail {
    let subject = format!(
        "Your {} r/{} digest: {} {} posts",
        subscription.frequency,
        subscription.subreddit,
        records.len(),
        subscription.sort
    );

    let heading = format!(
        "{} r/{} digest ({}, {})",
        upcase(subscription.frequency.as_str()),
        subscription.subreddit,
        subscription.sort,
        subscription.time_filter
    );
    let footer = format!(
        "You are receiving this because {} subscribed to r/{}. Unsubscribe from the digest page at any time.",
        subscription.email, subscription.subreddit
    );

    let mut text_body = String::new();
    let _ = writeln!(text_body, "{heading}");
    let _ = writeln!(text_body, "Generated {generated_at}");
    text_body.push('\n');
    text_body.push_str(&render_console(records));
    let _ = writeln!(text_body, "--");
    let _ = writeln!(text_body, "{footer}");

    let mut html_body = String::new();
    html_body.push_str("<!DOCTYPE html>\n<html><body style=\"font-family: sans-serif;\">\n");
    let _ = writeln!(html_body, "<h2>{}</h2>", encode_text(&heading));
    let _ = writeln!(
        html_body,
        "<p style=\"color: #666;\">Generated {}</p>",
        encode_text(generated_at)
    );
    html_body.push_str(&render_html(records));
    let _ = writeln!(
        html_body,
        "<hr><p style=\"color: #999; font-size: 0.8em;\">{}</p>",
        encode_text(&footer)
    );
    html_body.push_str("</body></html>\n");

    DigestEmail {
        to: subscription.email.clone(),
        subject,
        text_body,
        html_body,
    }
}
