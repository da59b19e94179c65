//! Browser-like request headers with a rotating User-Agent.
//!
//! The listing endpoints answer anonymous clients more readily when requests
//! look like they come from a desktop browser. Each request picks one entry
//! from a small fixed pool, uniformly at random.

use rand::Rng;
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};

/// User-Agent strings rotated across requests.
pub const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_6) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
];

/// Accept-Language values rotated alongside the User-Agent.
pub const ACCEPT_LANGUAGES: [&str; 3] = ["en-US,en;q=0.9", "en-GB,en;q=0.8", "en-US,en;q=0.5"];

/// The header values for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderSet {
    pub user_agent: &'static str,
    pub accept: &'static str,
    pub accept_language: &'static str,
    pub accept_encoding: &'static str,
}

impl HeaderSet {
    pub fn to_header_map(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(self.user_agent));
        headers.insert(ACCEPT, HeaderValue::from_static(self.accept));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(self.accept_language));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static(self.accept_encoding));
        headers
    }
}

/// Pick a header set using the supplied random source.
///
/// Pure apart from the RNG, so tests pass a seeded `StdRng` and get a
/// reproducible choice.
pub fn pick_headers<R: Rng + ?Sized>(rng: &mut R) -> HeaderSet {
    HeaderSet {
        user_agent: USER_AGENTS[rng.random_range(0..USER_AGENTS.len())],
        accept: "application/json, text/plain, */*",
        accept_language: ACCEPT_LANGUAGES[rng.random_range(0..ACCEPT_LANGUAGES.len())],
        accept_encoding: "gzip, deflate",
    }
}
