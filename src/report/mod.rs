pub mod json;
pub mod junit;
pub mod types;

use anyhow::{Context, Result};
use std::path::Path;

pub use types::{PublishRecord, PublishStatus, PublishSummary};

/// Write the JSON and JUnit reports of a run into `output_dir`
pub fn write_reports(summary: &PublishSummary, output_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create report dir: {}", output_dir.display()))?;
    json::write_report(summary, output_dir)?;
    junit::write_report(summary, output_dir)?;
    Ok(())
}
