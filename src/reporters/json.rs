//! JSON reporter
//!
//! Outputs the full RunReport as pretty-printed JSON, including every
//! author's factor breakdown. Useful for piping to jq.

use crate::pipeline::RunReport;
use anyhow::Result;

/// Render report as JSON
pub fn render(report: &RunReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
