//! Per-record result summary.

use serde::Serialize;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::BatchOutcomes;

/// Header row of the summary file
pub const SUMMARY_HEADER: &str = "index,name,status,stage,artifact";

#[derive(Serialize)]
struct SummaryRow<'a> {
    index: usize,
    name: &'a str,
    status: &'static str,
    stage: &'static str,
    artifact: &'a str,
}

/// Render the summary as CSV, one row per record in original order.
pub fn render_summary(outcomes: &BatchOutcomes) -> Result<Vec<u8>> {
    let results = outcomes.results();
    let mut writer = csv::Writer::from_writer(Vec::new());

    for result in &results {
        writer.serialize(SummaryRow {
            index: result.index,
            name: &result.record.name,
            status: result.status.as_str(),
            stage: result.stage.map(|s| s.as_str()).unwrap_or(""),
            artifact: result.artifact.as_deref().unwrap_or(""),
        })?;
    }

    if results.is_empty() {
        writer.write_record(SUMMARY_HEADER.split(','))?;
    }

    writer
        .into_inner()
        .map_err(|e| Error::Io(e.into_error()))
}

/// Write the summary file for a batch to `path`.
pub async fn write_summary(path: &Path, outcomes: &BatchOutcomes) -> Result<()> {
    let content = render_summary(outcomes)?;
    tokio::fs::write(path, content).await?;
    Ok(())
}
