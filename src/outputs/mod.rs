//! Output generation for fetched listings.
//!
//! Every renderer is a pure function from `&[PostRecord]` to a `String`;
//! the text export also takes the [`ListingQuery`] for its banner.
//! [`render`] dispatches on [`OutputFormat`]. [`export_records`] writes a
//! rendered listing to a generated file name.
//!
//! # Submodules
//!
//! - [`console`]: human-readable terminal listing
//! - [`text`]: plain-text export with a fixed banner and footer
//! - [`csv`]: CSV export (`Position,Title,Author,Score,Comments,URL,Created,Subreddit`)
//! - [`html`]: self-contained HTML fragment
//! - [`json`]: pretty-printed JSON array
//! - [`email`]: subject and bodies for a subscription digest
//!
//! # Export naming
//!
//! ```text
//! export_dir/
//! ├── programming_top_week_20250506_093000.csv
//! └── rust_hot_all_20250506_093012.txt
//! ```

pub mod console;
pub mod csv;
pub mod email;
pub mod html;
pub mod json;
pub mod text;

use crate::models::{ListingQuery, PostRecord};
use crate::utils::{ensure_writable_dir, slugify};
use chrono::Local;
use clap::ValueEnum;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, instrument};

/// Supported renderings of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Console,
    Text,
    Csv,
    Html,
    Json,
}

impl OutputFormat {
    /// File extension used by [`export_records`].
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Console | OutputFormat::Text => "txt",
            OutputFormat::Csv => "csv",
            OutputFormat::Html => "html",
            OutputFormat::Json => "json",
        }
    }
}

/// Render the `records` fetched for `query` in the requested format.
pub fn render(query: &ListingQuery, records: &[PostRecord], format: OutputFormat) -> String {
    match format {
        OutputFormat::Console => console::render_console(records),
        OutputFormat::Text => {
            let exported_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
            text::render_text(query, records, &exported_at)
        }
        OutputFormat::Csv => csv::render_csv(records),
        OutputFormat::Html => html::render_html(records),
        OutputFormat::Json => json::render_json(records),
    }
}

/// Build the export file name for a query.
///
/// `<subreddit>_<sort>_<time>_<YYYYmmdd_HHMMSS>.<ext>`
pub fn export_file_name(query: &ListingQuery, format: OutputFormat, stamp: &str) -> String {
    format!(
        "{}_{}_{}_{}.{}",
        slugify(&query.subreddit),
        query.sort,
        query.time_filter,
        stamp,
        format.extension()
    )
}

/// Render `records` and write them into `export_dir`.
///
/// The directory is created if missing.
///
/// # Returns
///
/// The path of the written file.
#[instrument(level = "info", skip_all, fields(%export_dir, subreddit = %query.subreddit, ?format))]
pub async fn export_records(
    query: &ListingQuery,
    records: &[PostRecord],
    format: OutputFormat,
    export_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    ensure_writable_dir(export_dir).await?;

    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let path = PathBuf::from(export_dir).join(export_file_name(query, format, &stamp));
    let body = render(query, records, format);

    fs::write(&path, body.as_bytes()).await?;
    info!(path = %path.display(), count = records.len(), bytes = body.len(), "Wrote export file");
    Ok(path)
}
