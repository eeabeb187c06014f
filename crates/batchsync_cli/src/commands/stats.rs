//! Engine-wide and per-configuration statistics.

use tabled::{Table, Tabled, settings::Style};
use uuid::Uuid;

use batchsync::BatchSyncEngine;
use batchsync::sync::{ConfigStats, EngineStats};

use super::OutputFormat;
use super::shared::{format_ms, format_time};

#[derive(Debug, Tabled)]
struct StatRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn row(metric: &'static str, value: impl ToString) -> StatRow {
    StatRow {
        metric,
        value: value.to_string(),
    }
}

fn engine_rows(stats: &EngineStats) -> Vec<StatRow> {
    vec![
        row("Configurations", stats.total_configs),
        row("Enabled", stats.enabled_configs),
        row("Recorded Runs", stats.total_syncs),
        row("Runs Today", stats.syncs_today),
        row("Success Rate", format!("{:.1}%", stats.success_rate)),
        row(
            "Avg Duration",
            format_ms(Some(stats.average_processing_time_ms.round() as u64)),
        ),
        row("Accounts Synced", stats.total_accounts_synced),
        row("Items Updated", stats.total_items_updated),
    ]
}

fn config_rows(stats: &ConfigStats) -> Vec<StatRow> {
    vec![
        row("Name", &stats.name),
        row("Runs", stats.total_runs),
        row("Completed", stats.completed),
        row("Partial", stats.partial),
        row("Failed", stats.failed),
        row("Cancelled", stats.cancelled),
        row("Success Rate", format!("{:.1}%", stats.success_rate)),
        row(
            "Avg Duration",
            format_ms(Some(stats.average_processing_time_ms.round() as u64)),
        ),
        row(
            "Avg Accounts/min",
            format!("{:.1}", stats.average_accounts_per_minute),
        ),
        row(
            "Last Status",
            stats
                .last_status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ),
        row("Last Sync", format_time(stats.last_sync)),
    ]
}

/// Handle the stats command.
pub(crate) fn handle_stats(
    engine: &BatchSyncEngine,
    id: Option<Uuid>,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match id {
        Some(id) => {
            let stats = engine.get_config_stats(id)?;
            match output {
                OutputFormat::Table => print_rows(config_rows(&stats)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
            }
        }
        None => {
            let stats = engine.get_stats();
            match output {
                OutputFormat::Table => print_rows(engine_rows(&stats)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
            }
        }
    }
    Ok(())
}

fn print_rows(rows: Vec<StatRow>) {
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
}
