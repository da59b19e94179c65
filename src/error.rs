//! Error types for listing fetches and digest delivery.
//!
//! Every failure of a single fetch is terminal for that call. Callers decide
//! what to do with it: the CLI reports and moves on to the next subreddit, the
//! HTTP surface turns it into a `success: false` body, and the scheduler logs
//! it and waits for the next slot.

use thiserror::Error;

/// Failure of one listing fetch.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid sort '{0}' (expected hot, new, top, rising or controversial)")]
    InvalidSort(String),

    #[error("invalid time window '{0}' (expected hour, day, week, month, year or all)")]
    InvalidTimeWindow(String),

    #[error("invalid subreddit name '{0}'")]
    InvalidSubreddit(String),

    #[error("subreddit r/{subreddit} not found")]
    NotFound { subreddit: String },

    #[error("request blocked by upstream (403) for {url}")]
    Blocked { url: String },

    #[error("rate limited by upstream (429) for {url}")]
    RateLimited { url: String },

    #[error("network error: {message}")]
    Network {
        message: String,
        status: Option<u16>,
    },

    #[error("unexpected listing response: {0}")]
    Parse(String),
}

impl FetchError {
    /// Machine-readable error code for API bodies and logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            FetchError::InvalidSort(_) => "invalid_sort",
            FetchError::InvalidTimeWindow(_) => "invalid_time_window",
            FetchError::InvalidSubreddit(_) => "invalid_subreddit",
            FetchError::NotFound { .. } => "not_found",
            FetchError::Blocked { .. } => "blocked",
            FetchError::RateLimited { .. } => "rate_limited",
            FetchError::Network { .. } => "network_error",
            FetchError::Parse(_) => "parse_error",
        }
    }

    /// HTTP status the local API answers with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - caller supplied an unusable query
            FetchError::InvalidSort(_)
            | FetchError::InvalidTimeWindow(_)
            | FetchError::InvalidSubreddit(_) => 400,

            FetchError::NotFound { .. } => 404,

            // 429 is passed through so browsers back off too
            FetchError::RateLimited { .. } => 429,

            // 502 Bad Gateway - upstream misbehaved
            FetchError::Blocked { .. } | FetchError::Network { .. } | FetchError::Parse(_) => 502,
        }
    }

    /// Whether re-issuing the query against an alternate host may help.
    ///
    /// Validation errors, missing subreddits and malformed bodies fail the
    /// same way everywhere.
    pub fn allows_fallback(&self) -> bool {
        matches!(self, FetchError::Blocked { .. } | FetchError::Network { .. })
    }

    /// Message suitable for an end user.
    pub fn user_message(&self) -> String {
        match self {
            FetchError::InvalidSort(_)
            | FetchError::InvalidTimeWindow(_)
            | FetchError::InvalidSubreddit(_) => self.to_string(),
            FetchError::NotFound { subreddit } => {
                format!("Subreddit r/{subreddit} does not exist or is private.")
            }
            FetchError::Blocked { .. } => {
                "Reddit refused the request (403). Try again later or from another network."
                    .to_string()
            }
            FetchError::RateLimited { .. } => {
                "Reddit is rate limiting requests. Please wait a minute and try again.".to_string()
            }
            FetchError::Network { .. } => {
                "Could not reach Reddit. Please check your connection.".to_string()
            }
            FetchError::Parse(_) => "Reddit returned a response that could not be read.".to_string(),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        let message = if e.is_timeout() {
            format!("request timed out: {e}")
        } else if e.is_connect() {
            format!("connection failed: {e}")
        } else {
            e.to_string()
        };
        FetchError::Network {
            message,
            status: e.status().map(|s| s.as_u16()),
        }
    }
}

/// Failure to deliver a digest email.
#[derive(Error, Debug)]
pub enum MailError {
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("SMTP transport error: {0}")]
    Transport(String),
}

impl From<lettre::error::Error> for MailError {
    fn from(e: lettre::error::Error) -> Self {
        MailError::Build(e.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for MailError {
    fn from(e: lettre::transport::smtp::Error) -> Self {
        MailError::Transport(e.to_string())
    }
}
