//! Data models for listing queries, post records and email subscriptions.
//!
//! This module defines the core data structures used throughout the application:
//! - [`SortMode`] and [`TimeWindow`]: the ranking selectors accepted by the listing endpoint
//! - [`ListingQuery`]: a validated (subreddit, sort, time window, limit) tuple
//! - [`PostRecord`]: one flattened post from a fetched listing
//! - [`Subscription`] and [`Frequency`]: recurring email digests
//!
//! Query parameters are copied onto every [`PostRecord`] so that exports can be
//! grouped without carrying the query around separately.

use crate::error::FetchError;
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest `limit` the listing endpoint honours.
pub const MAX_LIMIT: u32 = 100;

static SUBREDDIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_]{2,21}(\+[A-Za-z0-9_]{2,21})*$").expect("static regex")
});

/// Ranking algorithm selector for a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    Hot,
    New,
    Top,
    Rising,
    Controversial,
}

impl SortMode {
    /// Every supported sort, in the order the site lists them.
    pub const ALL: [SortMode; 5] = [
        SortMode::Hot,
        SortMode::New,
        SortMode::Top,
        SortMode::Rising,
        SortMode::Controversial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::Hot => "hot",
            SortMode::New => "new",
            SortMode::Top => "top",
            SortMode::Rising => "rising",
            SortMode::Controversial => "controversial",
        }
    }

    /// Only `top` and `controversial` are computed over a trailing time window.
    pub fn supports_time_filter(&self) -> bool {
        matches!(self, SortMode::Top | SortMode::Controversial)
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortMode {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        SortMode::ALL
            .into_iter()
            .find(|sort| sort.as_str() == wanted)
            .ok_or_else(|| FetchError::InvalidSort(s.to_string()))
    }
}

/// Trailing period over which `top`/`controversial` rankings are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Hour,
    Day,
    Week,
    Month,
    Year,
    #[default]
    All,
}

impl TimeWindow {
    pub const ALL: [TimeWindow; 6] = [
        TimeWindow::Hour,
        TimeWindow::Day,
        TimeWindow::Week,
        TimeWindow::Month,
        TimeWindow::Year,
        TimeWindow::All,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Hour => "hour",
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
            TimeWindow::Month => "month",
            TimeWindow::Year => "year",
            TimeWindow::All => "all",
        }
    }

    /// "All time" is what the endpoint assumes when `t` is omitted.
    pub fn is_default(&self) -> bool {
        matches!(self, TimeWindow::All)
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeWindow {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        TimeWindow::ALL
            .into_iter()
            .find(|window| window.as_str() == wanted)
            .ok_or_else(|| FetchError::InvalidTimeWindow(s.to_string()))
    }
}

/// A validated listing request.
///
/// Construct through [`ListingQuery::new`] or [`ListingQuery::parse`] so the
/// subreddit name is normalised and the limit is clamped to `1..=100`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    pub subreddit: String,
    pub sort: SortMode,
    pub time_filter: TimeWindow,
    pub limit: u32,
}

impl ListingQuery {
    /// Build a query from typed selectors.
    ///
    /// Accepts `programming`, `r/programming` and `/r/programming/` alike.
    /// Multireddits joined with `+` are allowed.
    ///
    /// # Errors
    ///
    /// [`FetchError::InvalidSubreddit`] if the name contains anything other
    /// than letters, digits, underscores and `+` separators.
    pub fn new(
        subreddit: &str,
        sort: SortMode,
        time_filter: TimeWindow,
        limit: u32,
    ) -> Result<Self, FetchError> {
        let name = normalize_subreddit(subreddit);
        if !SUBREDDIT_RE.is_match(&name) {
            return Err(FetchError::InvalidSubreddit(subreddit.to_string()));
        }
        Ok(Self {
            subreddit: name,
            sort,
            time_filter,
            limit: limit.clamp(1, MAX_LIMIT),
        })
    }

    /// Build a query from raw strings, e.g. HTTP query parameters.
    pub fn parse(subreddit: &str, sort: &str, time: &str, limit: u32) -> Result<Self, FetchError> {
        let sort = sort.parse::<SortMode>()?;
        let time_filter = time.parse::<TimeWindow>()?;
        Self::new(subreddit, sort, time_filter, limit)
    }

    /// The `t` value sent upstream, if any.
    pub fn effective_time_filter(&self) -> Option<TimeWindow> {
        if self.sort.supports_time_filter() && !self.time_filter.is_default() {
            Some(self.time_filter)
        } else {
            None
        }
    }
}

/// Strip `r/` and surrounding slashes from a subreddit name.
pub(crate) fn normalize_subreddit(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    trimmed
        .strip_prefix("r/")
        .unwrap_or(trimmed)
        .trim_matches('/')
        .to_string()
}

/// One post from a fetched listing.
///
/// Records are built once per fetch and never mutated. `position` is the
/// 1-based rank among the posts kept from that fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub position: usize,
    pub title: String,
    pub author: String,
    pub url: String,
    pub permalink: String,
    pub score: u64,
    pub num_comments: u64,
    /// Creation time as `YYYY-MM-DD HH:MM:SS UTC`.
    pub created_at: String,
    pub subreddit: String,
    pub sort_type: SortMode,
    pub time_filter: TimeWindow,
    /// Leading part of the self-post body, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selftext: Option<String>,
}

/// How often a subscription digest is mailed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            other => Err(format!("unsupported frequency '{other}'")),
        }
    }
}

/// A recurring email digest for one (email, subreddit) pair.
///
/// Held only in memory by [`crate::subscriptions::SubscriptionStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub email: String,
    pub subreddit: String,
    pub sort: SortMode,
    pub time_filter: TimeWindow,
    pub frequency: Frequency,
    /// Number of posts per digest.
    pub posts: u32,
    /// Local wall-clock time of the next delivery.
    pub next_send: NaiveDateTime,
}

impl Subscription {
    /// Whether this subscription targets the same (email, subreddit) pair.
    ///
    /// Emails compare case-insensitively, subreddit names too.
    pub fn same_target(&self, email: &str, subreddit: &str) -> bool {
        self.email.eq_ignore_ascii_case(email) && self.subreddit.eq_ignore_ascii_case(subreddit)
    }

    /// The listing query a digest for this subscription runs.
    pub fn query(&self) -> Result<ListingQuery, FetchError> {
        ListingQuery::new(&self.subreddit, self.sort, self.time_filter, self.posts)
    }
}
