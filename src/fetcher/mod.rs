//! Listing fetcher for the public subreddit JSON endpoints.
//!
//! Every front end (CLI, local HTTP API, digest scheduler) goes through
//! [`ListingFetcher`]. A fetch follows the same steps each time:
//!
//! 1. **Build** the URL: `<base>/r/<subreddit>/<sort>.json?limit=<n>[&t=<window>]`
//! 2. **Pause** for a randomized politeness delay
//! 3. **Send** one GET with a rotated User-Agent ([`headers`])
//! 4. **Interpret** the status code
//! 5. **Parse** the body into [`PostRecord`]s ([`parse`])
//!
//! # Status handling
//!
//! | Status | Result |
//! |--------|--------|
//! | 200 | body parsed |
//! | 403 | [`FetchError::Blocked`], never retried |
//! | 404 | [`FetchError::NotFound`] |
//! | 429 | one fixed backoff wait and one more attempt, then [`FetchError::RateLimited`] |
//! | other | [`FetchError::Network`] |
//!
//! There is no retry budget, circuit breaker or failure cache. The only other
//! second chance is [`ListingFetcher::fetch_with_fallback`], which re-runs the
//! query once against an alternate host.

pub mod headers;
pub mod parse;

use crate::error::FetchError;
use crate::models::{ListingQuery, PostRecord};
use headers::pick_headers;
use parse::parse_listing;
use rand::Rng;
use reqwest::{Client, StatusCode};
use std::error::Error;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Tuning knobs for [`ListingFetcher`].
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Primary host, e.g. `https://www.reddit.com`.
    pub base_url: String,
    /// Alternate host used by [`ListingFetcher::fetch_with_fallback`].
    pub fallback_base_url: Option<String>,
    /// Per-request socket timeout.
    pub timeout: Duration,
    /// Lower bound of the politeness delay before each fetch.
    pub min_delay: Duration,
    /// Upper bound of the politeness delay before each fetch.
    pub max_delay: Duration,
    /// Fixed wait after a 429 before the single extra attempt.
    pub rate_limit_backoff: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.reddit.com".to_string(),
            fallback_base_url: Some("https://old.reddit.com".to_string()),
            timeout: Duration::from_secs(15),
            min_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(3000),
            rate_limit_backoff: Duration::from_secs(30),
        }
    }
}

/// Build the listing URL for `query` under `base`.
///
/// `t` is appended only for sorts ranked over a time window (`top`,
/// `controversial`) and only when the window isn't the default `all`.
pub fn build_listing_url(base: &Url, query: &ListingQuery) -> Url {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments
            .pop_if_empty()
            .push("r")
            .push(&query.subreddit)
            .push(&format!("{}.json", query.sort));
    }
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("limit", &query.limit.to_string());
        if let Some(window) = query.effective_time_filter() {
            pairs.append_pair("t", window.as_str());
        }
    }
    url
}

/// HTTP client for subreddit listings.
#[derive(Debug, Clone)]
pub struct ListingFetcher {
    client: Client,
    base_url: Url,
    fallback_base_url: Option<Url>,
    config: FetchConfig,
}

impl ListingFetcher {
    /// Create a fetcher from `config`.
    ///
    /// # Errors
    ///
    /// Fails if either base URL doesn't parse or the HTTP client can't be built.
    pub fn new(config: FetchConfig) -> Result<Self, Box<dyn Error>> {
        let base_url = Url::parse(&config.base_url)?;
        let fallback_base_url = config
            .fallback_base_url
            .as_deref()
            .map(Url::parse)
            .transpose()?;

        let client = Client::builder()
            .timeout(config.timeout)
            .gzip(true)
            .deflate(true)
            .build()?;

        Ok(Self {
            client,
            base_url,
            fallback_base_url,
            config,
        })
    }

    /// Fetch one listing from the primary host.
    ///
    /// # Returns
    ///
    /// The posts in listing order with `position` 1..=N. An empty vector means
    /// the listing exists but had no titled posts.
    pub async fn fetch(&self, query: &ListingQuery) -> Result<Vec<PostRecord>, FetchError> {
        self.fetch_from(&self.base_url, query).await
    }

    /// Fetch one listing, re-issuing it once against the fallback host when
    /// the primary host blocks the request or can't be reached.
    pub async fn fetch_with_fallback(
        &self,
        query: &ListingQuery,
    ) -> Result<Vec<PostRecord>, FetchError> {
        match self.fetch(query).await {
            Err(e) if e.allows_fallback() => match &self.fallback_base_url {
                Some(fallback) => {
                    warn!(error = %e, fallback = %fallback, "Primary host failed; trying fallback host");
                    self.fetch_from(fallback, query).await
                }
                None => Err(e),
            },
            other => other,
        }
    }

    #[instrument(level = "info", skip_all, fields(subreddit = %query.subreddit, sort = %query.sort, host = ?base.host_str()))]
    async fn fetch_from(
        &self,
        base: &Url,
        query: &ListingQuery,
    ) -> Result<Vec<PostRecord>, FetchError> {
        let url = build_listing_url(base, query);
        self.politeness_pause().await;

        let t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            let headers = pick_headers(&mut rand::rng());
            debug!(%url, attempt, user_agent = headers.user_agent, "Sending listing request");

            let response = self
                .client
                .get(url.clone())
                .headers(headers.to_header_map())
                .send()
                .await?;
            let status = response.status();

            if status == StatusCode::OK {
                let body = response.text().await?;
                let records = parse_listing(&body, query)?;
                info!(
                    count = records.len(),
                    bytes = body.len(),
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "Fetched listing"
                );
                return Ok(records);
            }

            match status {
                StatusCode::FORBIDDEN => {
                    warn!(%url, "Listing request blocked (403)");
                    return Err(FetchError::Blocked {
                        url: url.to_string(),
                    });
                }
                StatusCode::NOT_FOUND => {
                    return Err(FetchError::NotFound {
                        subreddit: query.subreddit.clone(),
                    });
                }
                StatusCode::TOO_MANY_REQUESTS if attempt == 1 => {
                    let delay = self.config.rate_limit_backoff;
                    warn!(%url, ?delay, "Rate limited (429); waiting once before retrying");
                    sleep(delay).await;
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    warn!(%url, attempt, "Still rate limited after backoff; giving up");
                    return Err(FetchError::RateLimited {
                        url: url.to_string(),
                    });
                }
                other => {
                    warn!(%url, status = other.as_u16(), "Unexpected listing status");
                    return Err(FetchError::Network {
                        message: format!("unexpected HTTP status {other}"),
                        status: Some(other.as_u16()),
                    });
                }
            }
        }
    }

    async fn politeness_pause(&self) {
        let lo = self.config.min_delay.min(self.config.max_delay);
        let hi = self.config.min_delay.max(self.config.max_delay);
        if hi.is_zero() {
            return;
        }
        let ms = rand::rng().random_range(lo.as_millis() as u64..=hi.as_millis() as u64);
        let delay = Duration::from_millis(ms);
        debug!(?delay, "Politeness delay");
        sleep(delay).await;
    }
}
