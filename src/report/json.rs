use super::types::PublishSummary;
use anyhow::Result;
use std::path::Path;

/// Write the summary as pretty-printed JSON to `output_dir/publish.json`
pub fn write_report(summary: &PublishSummary, output_dir: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    let path = output_dir.join("publish.json");
    std::fs::write(&path, json)?;
    log::info!("JSON report saved to: {}", path.display());
    Ok(())
}
