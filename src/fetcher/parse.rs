//! Listing body parsing.
//!
//! The endpoint has answered in two shapes over time:
//!
//! | Shape | Example |
//! |-------|---------|
//! | Listing object | `{"kind": "Listing", "data": {"children": [...]}}` |
//! | Wrapped array | `[{"data": {"children": [...]}}, {...}]` |
//!
//! Both are resolved once into [`ListingBody`]; nothing downstream looks at
//! the raw JSON again.

use crate::error::FetchError;
use crate::models::{ListingQuery, PostRecord};
use crate::utils::{format_epoch, looks_truncated, truncate_chars, truncate_for_log};
use serde::Deserialize;

/// Absolute prefix for relative permalinks.
pub const REDDIT_WEB_BASE: &str = "https://www.reddit.com";

/// Self-text previews are cut to this many characters.
pub const SELFTEXT_PREVIEW_CHARS: usize = 300;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListingBody {
    // Arrays must be tried first: serde also accepts a struct written as a sequence.
    Wrapped(Vec<serde_json::Value>),
    Listing(Listing),
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    #[serde(default)]
    data: RawPost,
}

/// Fields read from each child. Everything is optional upstream.
#[derive(Debug, Default, Deserialize)]
struct RawPost {
    title: Option<String>,
    author: Option<String>,
    url: Option<String>,
    permalink: Option<String>,
    score: Option<f64>,
    num_comments: Option<f64>,
    created_utc: Option<f64>,
    selftext: Option<String>,
}

impl ListingBody {
    fn into_listing(self) -> Result<Listing, FetchError> {
        match self {
            ListingBody::Wrapped(items) => {
                let first = items
                    .into_iter()
                    .next()
                    .ok_or_else(|| FetchError::Parse("empty response array".to_string()))?;
                serde_json::from_value(first)
                    .map_err(|e| FetchError::Parse(format!("first array element is not a listing: {e}")))
            }
            ListingBody::Listing(listing) => Ok(listing),
        }
    }
}

/// Parse a listing body into ordered post records.
///
/// Children without a `title` are dropped; `position` counts only the kept
/// children, starting at 1. The query is copied onto every record.
///
/// # Errors
///
/// [`FetchError::Parse`] when the body is neither of the two known shapes or
/// was cut off mid-transfer.
pub fn parse_listing(raw: &str, query: &ListingQuery) -> Result<Vec<PostRecord>, FetchError> {
    let body: ListingBody = serde_json::from_str(raw).map_err(|e| {
        if looks_truncated(&e) {
            FetchError::Parse(format!("truncated body: {e}"))
        } else {
            FetchError::Parse(format!(
                "{e} (body: {})",
                truncate_for_log(raw.trim(), 200)
            ))
        }
    })?;

    let listing = body.into_listing()?;

    let records = listing
        .data
        .children
        .into_iter()
        .filter_map(|child| {
            let mut post = child.data;
            let title = post.title.take()?;
            Some((title, post))
        })
        .enumerate()
        .map(|(i, (title, post))| to_record(i + 1, title, post, query))
        .collect();

    Ok(records)
}

fn to_record(position: usize, title: String, post: RawPost, query: &ListingQuery) -> PostRecord {
    let permalink = post
        .permalink
        .filter(|p| !p.trim().is_empty())
        .map(|p| absolute_permalink(&p))
        .unwrap_or_default();

    let url = post
        .url
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| permalink.clone());

    let title = if title.trim().is_empty() {
        "No title".to_string()
    } else {
        title
    };

    PostRecord {
        position,
        title,
        author: post
            .author
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| "Unknown".to_string()),
        url,
        permalink,
        score: non_negative(post.score),
        num_comments: non_negative(post.num_comments),
        created_at: post
            .created_utc
            .map(format_epoch)
            .unwrap_or_else(|| "Unknown".to_string()),
        subreddit: query.subreddit.clone(),
        sort_type: query.sort,
        time_filter: query.time_filter,
        selftext: post
            .selftext
            .filter(|s| !s.trim().is_empty())
            .map(|s| truncate_chars(s.trim(), SELFTEXT_PREVIEW_CHARS)),
    }
}

fn absolute_permalink(permalink: &str) -> String {
    if permalink.starts_with("http://") || permalink.starts_with("https://") {
        permalink.to_string()
    } else if permalink.starts_with('/') {
        format!("{REDDIT_WEB_BASE}{permalink}")
    } else {
        format!("{REDDIT_WEB_BASE}/{permalink}")
    }
}

fn non_negative(value: Option<f64>) -> u64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v as u64,
        _ => 0,
    }
}
