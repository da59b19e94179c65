//! Application state for the local HTTP server

use crate::fetcher::ListingFetcher;
use crate::subscriptions::SubscriptionStore;
use std::sync::Arc;

/// Shared state handed to every route handler.
///
/// Cloned per request; both fields are `Arc`s. The store is the same one the
/// scheduler task drains.
#[derive(Clone)]
pub struct AppState {
    pub fetcher: Arc<ListingFetcher>,
    pub store: Arc<SubscriptionStore>,
}

impl AppState {
    pub fn new(fetcher: Arc<ListingFetcher>, store: Arc<SubscriptionStore>) -> Self {
        Self { fetcher, store }
    }
}
