//! Run history display.

use tabled::{Table, Tabled, settings::Style};
use uuid::Uuid;

use batchsync::BatchSyncEngine;
use batchsync::sync::BatchSyncResult;

use super::OutputFormat;
use super::shared::{format_ms, format_time, require_config};

/// One recorded run, as shown in tables.
#[derive(Debug, Clone, serde::Serialize, Tabled)]
pub(crate) struct RunDisplay {
    #[tabled(rename = "Run")]
    pub(crate) run_id: String,
    #[tabled(rename = "Started")]
    pub(crate) started: String,
    #[tabled(rename = "Status")]
    pub(crate) status: String,
    #[tabled(rename = "Processed")]
    pub(crate) processed: String,
    #[tabled(rename = "OK")]
    pub(crate) successful: usize,
    #[tabled(rename = "Failed")]
    pub(crate) failed: usize,
    #[tabled(rename = "Skipped")]
    pub(crate) skipped: usize,
    #[tabled(rename = "Updated Items")]
    pub(crate) updated_items: u64,
    #[tabled(rename = "Duration")]
    pub(crate) duration: String,
    #[tabled(rename = "Accounts/min")]
    pub(crate) accounts_per_minute: String,
}

impl From<&BatchSyncResult> for RunDisplay {
    fn from(result: &BatchSyncResult) -> Self {
        let mut status = result.status.to_string();
        if result.dry_run {
            status.push_str(" (dry run)");
        }
        Self {
            run_id: result.id.simple().to_string()[..8].to_string(),
            started: format_time(Some(result.start_time)),
            status,
            processed: format!("{}/{}", result.processed_accounts, result.total_accounts),
            successful: result.successful_accounts,
            failed: result.failed_accounts,
            skipped: result.skipped_accounts,
            updated_items: result.items.updated,
            duration: format_ms(result.processing_time_ms),
            accounts_per_minute: format!("{:.1}", result.summary.accounts_per_minute),
        }
    }
}

/// Print runs, newest first.
pub(crate) fn print_runs<'a>(
    results: impl DoubleEndedIterator<Item = &'a BatchSyncResult>,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        OutputFormat::Table => {
            let rows: Vec<RunDisplay> = results.rev().map(RunDisplay::from).collect();
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{}", table);
        }
        OutputFormat::Json => {
            let runs: Vec<&BatchSyncResult> = results.rev().collect();
            println!("{}", serde_json::to_string_pretty(&runs)?);
        }
    }
    Ok(())
}

/// Handle the history command.
pub(crate) fn handle_history(
    engine: &BatchSyncEngine,
    id: Uuid,
    limit: Option<usize>,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = require_config(engine, id)?;
    let history = &config.sync_history;

    if history.is_empty() && matches!(output, OutputFormat::Table) {
        println!("No runs recorded for '{}'.", config.name);
        return Ok(());
    }

    let skip = limit.map_or(0, |limit| history.len().saturating_sub(limit));
    print_runs(history[skip..].iter(), output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use batchsync::sync::RunStatus;

    #[test]
    fn test_run_display_marks_dry_runs() {
        let mut result = BatchSyncResult::running(Uuid::new_v4(), 3, true, chrono::Utc::now());
        result.processed_accounts = 2;
        result.status = RunStatus::Partial;

        let display = RunDisplay::from(&result);
        assert_eq!(display.status, "partial (dry run)");
        assert_eq!(display.processed, "2/3");
        assert_eq!(display.run_id.len(), 8);
    }
}
