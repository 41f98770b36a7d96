//! Logger setup for the CLI

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Default filter when `RUST_LOG` is unset
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "testbench_reporter=debug,warn"
    } else {
        "testbench_reporter=info,warn"
    }
}

/// One reporter log line: `<ISO timestamp>\t<LEVEL>\t<message>`
pub fn format_line(timestamp: &str, level: log::Level, message: &str) -> String {
    format!("{}\t{}\t{}", timestamp, level, message)
}

/// Install the global logger.
///
/// Logs go to stderr unless `log_file` is given, in which case lines are
/// appended to that file in the reporter format.
pub fn init(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let env = env_logger::Env::default().default_filter_or(default_filter(verbose));
    let mut builder = env_logger::Builder::from_env(env);

    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;

        builder
            .target(env_logger::Target::Pipe(Box::new(file)))
            .format(|buf, record| {
                let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
                writeln!(
                    buf,
                    "{}",
                    format_line(&timestamp, record.level(), &record.args().to_string())
                )
            });
    }

    builder
        .try_init()
        .context("Logger was already initialized")?;
    Ok(())
}
