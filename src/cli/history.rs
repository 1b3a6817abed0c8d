//! Conversation log viewer.

use anyhow::{Context, Result};

use bender::cache::PersistentLog;
use bender::config::Config;

use super::render::{wrap, WRAP_WIDTH};

/// Print the most recent `limit` records, optionally for one prompt only.
pub(crate) fn cmd_history(config: &Config, limit: usize, prompt: Option<&str>) -> Result<()> {
    let log = PersistentLog::new(&config.cache.path);
    let report = log
        .load_all()
        .with_context(|| format!("Failed to read {}", log.path().display()))?;

    let records: Vec<_> = report
        .records
        .iter()
        .filter(|r| prompt.map_or(true, |p| r.prompt == p))
        .collect();

    if records.is_empty() {
        println!("No recorded responses found.");
        return Ok(());
    }

    let skip = records.len().saturating_sub(limit);
    println!(
        "Showing {} of {} record(s) from {}:",
        records.len() - skip,
        records.len(),
        log.path().display()
    );
    for record in &records[skip..] {
        println!();
        println!("[{}] {}", record.timestamp.to_rfc3339(), record.prompt);
        for line in wrap(&record.response, WRAP_WIDTH) {
            println!("  {line}");
        }
    }

    if report.skipped > 0 {
        println!();
        println!("Skipped {} unreadable line(s).", report.skipped);
    }
    Ok(())
}
