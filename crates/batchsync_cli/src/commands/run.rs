//! Immediate execution of one configuration.

use console::style;
use tabled::{Table, Tabled, settings::Style};
use uuid::Uuid;

use batchsync::sync::{AccountStatus, BatchSyncResult, ExecuteOptions, RunStatus};
use batchsync::{BatchSyncEngine, EngineError};

use super::OutputFormat;
use super::shared::{EngineSession, format_ms, require_config};
use crate::shutdown::shutdown_requested;

/// Accounts listed in the failure table.
const MAX_FAILURES_SHOWN: usize = 20;

#[derive(Debug, Tabled)]
struct FailureDisplay {
    #[tabled(rename = "Account")]
    account: String,
    #[tabled(rename = "Status")]
    status: AccountStatus,
    #[tabled(rename = "Attempts")]
    attempts: u32,
    #[tabled(rename = "Error")]
    error: String,
}

/// Handle the run command.
///
/// The first Ctrl+C cancels the run through the engine; the cancelled result
/// is still recorded and printed.
pub(crate) async fn handle_run(
    session: EngineSession,
    id: Uuid,
    options: ExecuteOptions,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let EngineSession { engine, reporter } = session;
    let config = require_config(&engine, id)?;

    let runner = engine.clone();
    let mut run = tokio::spawn(async move { runner.execute_now(id, options).await });

    let result = tokio::select! {
        joined = &mut run => joined?,
        () = shutdown_requested() => {
            cancel_quietly(&engine, id).await;
            run.await?
        }
    }?;

    if let Some(reporter) = &reporter {
        reporter.finish();
    }

    match output {
        OutputFormat::Table => print_result(&config.name, &result),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }

    if result.status == RunStatus::Failed {
        return Err(format!("Sync of '{}' failed", config.name).into());
    }
    Ok(())
}

/// Cancel a run, ignoring a run that already finished.
pub(crate) async fn cancel_quietly(engine: &BatchSyncEngine, id: Uuid) {
    match engine.cancel(id).await {
        Ok(_) | Err(EngineError::NotRunning { .. }) => {}
        Err(e) => tracing::warn!(config_id = %id, error = %e, "Failed to cancel sync"),
    }
}

fn status_line(name: &str, result: &BatchSyncResult) -> String {
    let status = match result.status {
        RunStatus::Completed => style(result.status.to_string()).green().bold(),
        RunStatus::Partial | RunStatus::Cancelled => style(result.status.to_string()).yellow().bold(),
        _ => style(result.status.to_string()).red().bold(),
    };
    format!(
        "{} '{}': {} of {} accounts processed ({} ok, {} failed, {} skipped) in {}",
        status,
        style(name).cyan(),
        result.processed_accounts,
        result.total_accounts,
        result.successful_accounts,
        result.failed_accounts,
        result.skipped_accounts,
        format_ms(result.processing_time_ms)
    )
}

pub(crate) fn print_result(name: &str, result: &BatchSyncResult) {
    println!("{}", status_line(name, result));

    let summary = &result.summary;
    println!(
        "  {:.1}% success, {:.1} accounts/min, {:.1} items/min, confidence {:.2}",
        summary.success_rate,
        summary.accounts_per_minute,
        summary.items_per_minute,
        summary.average_confidence
    );
    if let Some(strategy) = &result.strategy
        && !strategy.chunk_sizes.is_empty()
    {
        println!(
            "  {} → {} mode, {} chunks, peak chunk {}",
            strategy.requested_mode,
            strategy.final_mode,
            strategy.chunk_sizes.len(),
            strategy.peak_chunk_size()
        );
    }
    for error in &result.errors {
        println!("  {} {}", style("✗").red(), error);
    }

    let failures: Vec<FailureDisplay> = result
        .account_results
        .iter()
        .filter(|a| a.status == AccountStatus::Failed)
        .take(MAX_FAILURES_SHOWN)
        .map(|a| FailureDisplay {
            account: a.account_id.clone(),
            status: a.status,
            attempts: a.retry_count,
            error: a.errors.last().cloned().unwrap_or_default(),
        })
        .collect();

    if !failures.is_empty() {
        let mut table = Table::new(failures);
        table.with(Style::rounded());
        println!("{}", table);
        if result.failed_accounts > MAX_FAILURES_SHOWN {
            println!(
                "  ... and {} more failed accounts",
                result.failed_accounts - MAX_FAILURES_SHOWN
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line_counts() {
        let mut result = BatchSyncResult::running(Uuid::new_v4(), 3, false, chrono::Utc::now());
        result.status = RunStatus::Partial;
        result.processed_accounts = 3;
        result.successful_accounts = 2;
        result.failed_accounts = 1;
        result.processing_time_ms = Some(1_500);

        let line = console::strip_ansi_codes(&status_line("nightly", &result)).to_string();
        assert!(line.starts_with("partial 'nightly'"));
        assert!(line.contains("3 of 3 accounts processed (2 ok, 1 failed, 0 skipped) in 1.5s"));
    }
}
