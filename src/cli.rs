//! Command-line interface definitions for Subreddit Digest.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Server and SMTP options can be provided via command-line flags or
//! environment variables.

use crate::fetcher::FetchConfig;
use crate::mailer::SmtpSettings;
use crate::outputs::OutputFormat;
use clap::{Args, Parser, Subcommand};
use std::net::IpAddr;
use std::time::Duration;

/// Command-line arguments for the Subreddit Digest application.
///
/// # Examples
///
/// ```sh
/// # Print the week's top posts of two subreddits
/// subreddit_digest fetch -s programming -s rust --sort top --time week --limit 5
///
/// # Export them as CSV and open the first three in the browser
/// subreddit_digest fetch -s programming --format csv --export-dir ./exports --open 3
///
/// # Run the local web page, API and digest scheduler
/// SMTP_SERVER=smtp.example.com SMTP_USERNAME=bot SMTP_PASSWORD=secret subreddit_digest serve
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Primary listing host
    #[arg(long, global = true, env = "REDDIT_BASE_URL", default_value = "https://www.reddit.com")]
    pub base_url: String,

    /// Alternate host tried once when the primary blocks or can't be reached
    #[arg(long, global = true, env = "REDDIT_FALLBACK_URL", default_value = "https://old.reddit.com")]
    pub fallback_url: String,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value_t = 15)]
    pub timeout_secs: u64,

    /// Lower bound of the randomized delay before each request, in milliseconds
    #[arg(long, global = true, default_value_t = 1000)]
    pub min_delay_ms: u64,

    /// Upper bound of the randomized delay before each request, in milliseconds
    #[arg(long, global = true, default_value_t = 3000)]
    pub max_delay_ms: u64,

    /// Wait after a 429 before the single retry, in seconds
    #[arg(long, global = true, default_value_t = 30)]
    pub rate_limit_backoff_secs: u64,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch listings and print or export them
    Fetch(FetchArgs),
    /// Run the local web page, JSON API and digest scheduler
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Subreddit to fetch; repeat for several
    #[arg(short, long = "subreddit", required = true)]
    pub subreddits: Vec<String>,

    /// hot, new, top, rising or controversial
    #[arg(long, default_value = "hot")]
    pub sort: String,

    /// hour, day, week, month, year or all (top/controversial only)
    #[arg(long, default_value = "all")]
    pub time: String,

    /// Posts per subreddit (1-100)
    #[arg(short, long, default_value_t = 25)]
    pub limit: u32,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Console)]
    pub format: OutputFormat,

    /// Write each listing to a file in this directory instead of stdout
    #[arg(short, long)]
    pub export_dir: Option<String>,

    /// Open the first N posts of each listing in the browser
    #[arg(long, value_name = "N")]
    pub open: Option<usize>,

    /// Only query the primary host
    #[arg(long)]
    pub no_fallback: bool,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    pub bind: IpAddr,

    #[arg(short, long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Seconds between digest schedule checks
    #[arg(long, default_value_t = 60)]
    pub poll_interval_secs: u64,

    #[arg(long, env = "SMTP_SERVER")]
    pub smtp_server: Option<String>,

    #[arg(long, env = "SMTP_PORT", default_value_t = 587)]
    pub smtp_port: u16,

    #[arg(long, env = "SMTP_USERNAME")]
    pub smtp_username: Option<String>,

    #[arg(long, env = "SMTP_PASSWORD", hide_env_values = true)]
    pub smtp_password: Option<String>,

    /// Sender address (defaults to the SMTP username)
    #[arg(long, env = "SMTP_FROM")]
    pub smtp_from: Option<String>,
}

impl Cli {
    /// Fetcher settings from the global options.
    pub fn fetch_config(&self, use_fallback: bool) -> FetchConfig {
        FetchConfig {
            base_url: self.base_url.clone(),
            fallback_base_url: use_fallback.then(|| self.fallback_url.clone()),
            timeout: Duration::from_secs(self.timeout_secs),
            min_delay: Duration::from_millis(self.min_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            rate_limit_backoff: Duration::from_secs(self.rate_limit_backoff_secs),
        }
    }
}

impl ServeArgs {
    /// SMTP settings, if enough of them are configured to send mail.
    pub fn smtp_settings(&self) -> Option<SmtpSettings> {
        SmtpSettings::from_parts(
            self.smtp_server.clone(),
            self.smtp_port,
            self.smtp_username.clone(),
            self.smtp_password.clone(),
            self.smtp_from.clone(),
        )
    }
}
