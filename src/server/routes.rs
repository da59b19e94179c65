//! Route handlers for the local HTTP server.
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | GET | `/` | [`index`] |
//! | GET | `/api/reddit` | [`get_posts`] |
//! | POST | `/api/subscribe` | [`subscribe`] |
//! | POST | `/api/unsubscribe` | [`unsubscribe`] |
//!
//! CORS preflight (`OPTIONS`) is answered by the CORS layer before any
//! handler runs.

use super::error_response::ApiError;
use super::state::AppState;
use crate::models::{Frequency, ListingQuery, PostRecord, Subscription, normalize_subreddit};
use crate::subscriptions::{AddOutcome, next_send_from_now};
use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    response::Html,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static regex"));

const INDEX_HTML: &str = include_str!("index.html");

const NEXT_SEND_FORMAT: &str = "%Y-%m-%d %H:%M";

fn default_sort() -> String {
    "hot".to_string()
}

fn default_time() -> String {
    "all".to_string()
}

fn default_limit() -> u32 {
    25
}

fn default_digest_sort() -> String {
    "top".to_string()
}

fn default_digest_time() -> String {
    "week".to_string()
}

fn default_frequency() -> String {
    "weekly".to_string()
}

fn default_posts() -> u32 {
    10
}

/// Query string of `GET /api/reddit`.
#[derive(Debug, Deserialize)]
pub struct PostsParams {
    #[serde(default)]
    pub subreddit: String,
    #[serde(default = "default_sort")]
    pub sort: String,
    #[serde(default = "default_time")]
    pub time: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Serialize)]
pub struct PostsResponse {
    pub success: bool,
    pub posts: Vec<PostRecord>,
    pub total: usize,
}

/// Body of `POST /api/subscribe`.
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
    #[serde(default = "default_frequency")]
    pub frequency: String,
    pub subreddit: String,
    #[serde(default = "default_digest_sort")]
    pub sort: String,
    #[serde(default = "default_digest_time")]
    pub time: String,
    #[serde(default = "default_posts")]
    pub posts: u32,
}

#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub success: bool,
    pub message: String,
    pub next_send: String,
}

/// Body of `POST /api/unsubscribe`.
#[derive(Debug, Deserialize)]
pub struct UnsubscribeRequest {
    pub email: String,
    #[serde(default)]
    pub subreddit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UnsubscribeResponse {
    pub success: bool,
    pub message: String,
    pub removed: usize,
}

/// Serve the single-page front end.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Fetch a listing on behalf of the web page.
#[instrument(level = "info", skip_all)]
pub async fn get_posts(
    State(state): State<AppState>,
    params: Result<Query<PostsParams>, QueryRejection>,
) -> Result<Json<PostsResponse>, ApiError> {
    let Query(params) = params?;
    let query = ListingQuery::parse(&params.subreddit, &params.sort, &params.time, params.limit)?;
    info!(subreddit = %query.subreddit, sort = %query.sort, time = %query.time_filter, limit = query.limit, "API listing request");

    let posts = state.fetcher.fetch_with_fallback(&query).await.map_err(|e| {
        warn!(subreddit = %query.subreddit, code = e.error_code(), error = %e, "API listing request failed");
        e
    })?;

    Ok(Json(PostsResponse {
        success: true,
        total: posts.len(),
        posts,
    }))
}

/// Create or replace a digest subscription.
#[instrument(level = "info", skip_all)]
pub async fn subscribe(
    State(state): State<AppState>,
    body: Result<Json<SubscribeRequest>, JsonRejection>,
) -> Result<Json<SubscribeResponse>, ApiError> {
    let Json(req) = body?;

    let email = req.email.trim().to_string();
    if !EMAIL_RE.is_match(&email) {
        return Err(ApiError::bad_request(
            "invalid_email",
            format!("'{email}' is not a valid email address"),
        ));
    }
    let frequency: Frequency = req
        .frequency
        .parse()
        .map_err(|e: String| ApiError::bad_request("invalid_frequency", e))?;
    let query = ListingQuery::parse(&req.subreddit, &req.sort, &req.time, req.posts)?;

    let next_send = next_send_from_now(frequency);
    let subscription = Subscription {
        email,
        subreddit: query.subreddit,
        sort: query.sort,
        time_filter: query.time_filter,
        frequency,
        posts: query.limit,
        next_send,
    };

    let message = match state.store.add(subscription.clone()).await {
        AddOutcome::Created => format!(
            "Subscribed {} to a {} digest of r/{}",
            subscription.email, frequency, subscription.subreddit
        ),
        AddOutcome::Replaced => format!(
            "Updated the r/{} subscription for {}",
            subscription.subreddit, subscription.email
        ),
    };

    Ok(Json(SubscribeResponse {
        success: true,
        message,
        next_send: next_send.format(NEXT_SEND_FORMAT).to_string(),
    }))
}

/// Remove one subscription, or every subscription of an address.
#[instrument(level = "info", skip_all)]
pub async fn unsubscribe(
    State(state): State<AppState>,
    body: Result<Json<UnsubscribeRequest>, JsonRejection>,
) -> Result<Json<UnsubscribeResponse>, ApiError> {
    let Json(req) = body?;
    let email = req.email.trim();
    let subreddit = req
        .subreddit
        .as_deref()
        .map(normalize_subreddit)
        .filter(|s| !s.is_empty());

    let removed = state.store.remove(email, subreddit.as_deref()).await;
    if removed == 0 {
        return Err(ApiError::not_found(
            "no_subscription",
            format!("No subscription found for {email}"),
        ));
    }

    Ok(Json(UnsubscribeResponse {
        success: true,
        message: format!("Removed {removed} subscription(s) for {email}"),
        removed,
    }))
}
