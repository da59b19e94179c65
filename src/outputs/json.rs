//! JSON rendering for exports and API consumers.
//!
//! Records serialize with snake_case field names; `sort_type` and
//! `time_filter` are lowercase strings.

use crate::models::PostRecord;

/// Render records as a pretty-printed JSON array.
pub fn render_json(records: &[PostRecord]) -> String {
    format!("{:#}", serde_json::json!(records))
}
