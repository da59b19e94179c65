//! # Subreddit Digest
//!
//! Fetches subreddit post listings from the public JSON endpoints, renders
//! them for the terminal or as export files, and serves a small local web
//! page with recurring email digests.
//!
//! ## Features
//!
//! - Listings by sort (hot, new, top, rising, controversial) and time window
//! - Console, plain-text, CSV, HTML and JSON renderings
//! - Rotated request headers, politeness delays and a single 429 back-off
//! - Local JSON API with weekly/monthly email digests over SMTP
//!
//! ## Usage
//!
//! ```sh
//! subreddit_digest fetch -s programming --sort top --time week --limit 5
//! subreddit_digest serve --port 8000
//! ```
//!
//! ## Architecture
//!
//! Every front end goes through the same pipeline:
//! 1. **Query**: validate subreddit, sort, time window and limit
//! 2. **Fetch**: one polite request per listing, with an optional fallback host
//! 3. **Parse**: flatten the listing into positioned post records
//! 4. **Output**: print, export, serve as JSON, or mail as a digest

use clap::Parser;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod error;
mod fetcher;
mod mailer;
mod models;
mod outputs;
mod scheduler;
mod server;
mod subscriptions;
mod utils;

use cli::{Cli, Command, FetchArgs, ServeArgs};
use fetcher::ListingFetcher;
use mailer::{LogMailer, SmtpMailer};
use models::{ListingQuery, PostRecord, normalize_subreddit};
use outputs::{OutputFormat, export_records, render};
use scheduler::SchedulerTask;
use server::{AppState, start_server};
use subscriptions::SubscriptionStore;
use utils::{ensure_writable_dir, open_in_browser};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = Instant::now();
    info!(version = env!("CARGO_PKG_VERSION"), "subreddit_digest starting up");

    let args = Cli::parse();
    debug!(?args.command, base_url = %args.base_url, "Parsed CLI arguments");

    let result = match &args.command {
        Command::Fetch(fetch) => run_fetch(&args, fetch).await,
        Command::Serve(serve) => run_serve(&args, serve).await,
    };

    let elapsed = start_time.elapsed();
    info!(?elapsed, secs = elapsed.as_secs(), "Execution complete");
    result
}

/// Fetch every requested subreddit in turn and print or export it.
///
/// A failing subreddit is reported and skipped. The command only fails when
/// no listing at all could be fetched.
async fn run_fetch(cli: &Cli, args: &FetchArgs) -> Result<(), Box<dyn Error>> {
    // Early check: an export dir we can't write to would waste every fetch
    if let Some(dir) = &args.export_dir {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(path = %dir, error = %e, "Export directory is not writable");
            return Err(e);
        }
    }

    let fetcher = ListingFetcher::new(cli.fetch_config(!args.no_fallback))?;
    let summary = fetch_all(&fetcher, args).await;

    if summary.succeeded == 0 {
        return Err(format!("no listings could be fetched ({} failed)", summary.failed).into());
    }
    Ok(())
}

/// Per-subreddit outcome counts of one `fetch` run.
#[derive(Debug, PartialEq, Eq)]
struct FetchSummary {
    succeeded: usize,
    failed: usize,
}

/// Fetch each distinct subreddit of `args` in order.
///
/// `rust`, `r/rust` and `/r/Rust/` name the same listing and are fetched once.
async fn fetch_all(fetcher: &ListingFetcher, args: &FetchArgs) -> FetchSummary {
    let subreddits: Vec<&String> = args
        .subreddits
        .iter()
        .unique_by(|s| normalize_subreddit(s).to_ascii_lowercase())
        .collect();
    info!(count = subreddits.len(), sort = %args.sort, time = %args.time, limit = args.limit, "Fetching listings");

    let outcomes: Vec<bool> = stream::iter(subreddits)
        .then(|subreddit| async move {
            match fetch_one(fetcher, subreddit, args).await {
                Ok(()) => true,
                Err(e) => {
                    error!(%subreddit, error = %e, "Skipping subreddit");
                    eprintln!("r/{subreddit}: {e}");
                    false
                }
            }
        })
        .collect()
        .await;

    let succeeded = outcomes.iter().filter(|ok| **ok).count();
    let summary = FetchSummary {
        succeeded,
        failed: outcomes.len() - succeeded,
    };
    info!(succeeded = summary.succeeded, failed = summary.failed, "Completed listing fetches");
    summary
}

async fn fetch_one(
    fetcher: &ListingFetcher,
    subreddit: &str,
    args: &FetchArgs,
) -> Result<(), Box<dyn Error>> {
    let query = ListingQuery::parse(subreddit, &args.sort, &args.time, args.limit)?;
    let records = fetcher.fetch_with_fallback(&query).await.map_err(|e| e.user_message())?;

    match &args.export_dir {
        Some(dir) => {
            let path = export_records(&query, &records, args.format, dir).await?;
            println!("r/{}: {} posts -> {}", query.subreddit, records.len(), path.display());
        }
        None => {
            if args.format == OutputFormat::Console {
                let window = query
                    .effective_time_filter()
                    .map(|w| format!(" ({w})"))
                    .unwrap_or_default();
                println!("=== r/{} | {}{} ===\n", query.subreddit, query.sort, window);
            }
            println!("{}", render(&query, &records, args.format));
        }
    }

    if let Some(n) = args.open {
        open_records(&records, n);
    }
    Ok(())
}

fn open_records(records: &[PostRecord], n: usize) {
    for record in records.iter().take(n) {
        let link = if record.permalink.is_empty() {
            &record.url
        } else {
            &record.permalink
        };
        if let Err(e) = open_in_browser(link) {
            warn!(url = %link, error = %e, "Failed to open browser");
        }
    }
}

/// Run the HTTP server with the digest scheduler beside it.
async fn run_serve(cli: &Cli, args: &ServeArgs) -> Result<(), Box<dyn Error>> {
    let fetcher = Arc::new(ListingFetcher::new(cli.fetch_config(true))?);
    let store = Arc::new(SubscriptionStore::new());
    let poll_interval = Duration::from_secs(args.poll_interval_secs.max(1));

    let scheduler = match args.smtp_settings() {
        Some(settings) => {
            let mailer = SmtpMailer::new(&settings)?;
            let task = SchedulerTask::new(fetcher.clone(), store.clone(), mailer, poll_interval);
            tokio::spawn(task.run())
        }
        None => {
            warn!("SMTP_SERVER, SMTP_USERNAME and SMTP_PASSWORD not all set; digests will only be logged");
            let task = SchedulerTask::new(fetcher.clone(), store.clone(), LogMailer, poll_interval);
            tokio::spawn(task.run())
        }
    };

    let addr = SocketAddr::new(args.bind, args.port);
    let result = start_server(addr, AppState::new(fetcher, store)).await;

    scheduler.abort();
    info!("Scheduler task stopped");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::tests::{listing_body, test_config};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetch_args(subreddits: &[&str], export_dir: Option<String>) -> FetchArgs {
        FetchArgs {
            subreddits: subreddits.iter().map(|s| s.to_string()).collect(),
            sort: "hot".to_string(),
            time: "all".to_string(),
            limit: 5,
            format: OutputFormat::Json,
            export_dir,
            open: None,
            no_fallback: true,
        }
    }

    async fn mount_missing(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/r/gone/hot.json"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_fetch_all_counts_and_skips_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/r/rust/hot.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing_body(&["one", "two"])))
            .expect(1)
            .mount(&server)
            .await;
        mount_missing(&server).await;
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = ListingFetcher::new(test_config(&server.uri())).unwrap();
        let args = fetch_args(
            &["rust", "gone", "/r/Rust/"],
            Some(tmp.path().to_str().unwrap().to_string()),
        );

        let summary = fetch_all(&fetcher, &args).await;

        assert_eq!(summary, FetchSummary { succeeded: 1, failed: 1 });
        let files: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn test_run_fetch_fails_when_nothing_fetched() {
        let server = MockServer::start().await;
        mount_missing(&server).await;
        let cli = Cli::try_parse_from([
            "subreddit_digest",
            "--base-url",
            &server.uri(),
            "--min-delay-ms",
            "0",
            "--max-delay-ms",
            "0",
            "fetch",
            "-s",
            "gone",
            "--no-fallback",
        ])
        .unwrap();
        let Command::Fetch(args) = &cli.command else {
            panic!("expected the fetch subcommand");
        };

        let err = run_fetch(&cli, args).await.unwrap_err();
        assert!(err.to_string().contains("1 failed"));
    }
}
