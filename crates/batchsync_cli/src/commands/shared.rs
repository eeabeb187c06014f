//! Engine construction and lookups shared by the commands.

use std::sync::Arc;

use batchsync::sync::BatchSyncConfig;
use batchsync::{
    AccountSyncClient, BatchSyncEngine, DatabaseConfigStore, NoopAccountSyncClient,
    RateLimitedClient, db,
};
use console::style;
use uuid::Uuid;

use crate::config::Config;
use crate::progress::ProgressReporter;

/// An engine backed by the configured database, with every stored
/// configuration loaded.
pub(crate) struct EngineSession {
    pub(crate) engine: BatchSyncEngine,
    pub(crate) reporter: Option<Arc<ProgressReporter>>,
}

/// Connect, migrate and load the engine.
///
/// A reporter is attached when the command drives runs.
pub(crate) async fn open_engine(
    config: &Config,
    database_url: &str,
    with_progress: bool,
) -> Result<EngineSession, Box<dyn std::error::Error>> {
    let db = db::connect_and_migrate(database_url).await?;
    let store = Arc::new(DatabaseConfigStore::new(Arc::new(db)));

    let mut builder = BatchSyncEngine::builder()
        .shared_client(build_client(config)?)
        .store(store)
        .options(config.engine.clone());

    let reporter = with_progress.then(|| Arc::new(ProgressReporter::new()));
    if let Some(reporter) = &reporter {
        builder = builder.on_event(reporter.as_callback());
    }

    let engine = builder.build()?;
    let loaded = engine.load_from_store().await?;
    tracing::debug!(loaded, "Loaded configurations");

    if let Some(reporter) = &reporter {
        reporter.register_configs(&engine.get_configs());
    }

    Ok(EngineSession { engine, reporter })
}

/// Build the account sync client from the `[client]` section.
///
/// Without an endpoint, accounts go to the no-op client.
fn build_client(config: &Config) -> Result<Arc<dyn AccountSyncClient>, Box<dyn std::error::Error>> {
    let rps = config.client.requests_per_second;

    match &config.client.endpoint {
        #[cfg(feature = "http")]
        Some(endpoint) => {
            let client = batchsync::client::HttpAccountSyncClient::new(
                endpoint.clone(),
                config.client.token.clone(),
                config.client.timeout(),
            )?;
            tracing::debug!(endpoint = %endpoint, rps, "Using HTTP account sync client");
            Ok(Arc::new(RateLimitedClient::new(client, rps)))
        }
        #[cfg(not(feature = "http"))]
        Some(_) => Err("A client endpoint is configured but this build lacks the `http` feature".into()),
        None => {
            tracing::debug!("No client endpoint configured, using no-op client");
            Ok(Arc::new(RateLimitedClient::new(NoopAccountSyncClient, rps)))
        }
    }
}

/// Look up a configuration by id.
pub(crate) fn require_config(
    engine: &BatchSyncEngine,
    id: Uuid,
) -> Result<BatchSyncConfig, Box<dyn std::error::Error>> {
    engine
        .get_config(id)
        .ok_or_else(|| format!("Configuration '{}' not found. List them with: batchsync config list", id).into())
}

/// Print a success line.
pub(crate) fn print_ok(message: impl std::fmt::Display) {
    println!("{} {}", style("✓").green().bold(), message);
}

/// Format an optional timestamp for tables.
pub(crate) fn format_time(time: Option<chrono::DateTime<chrono::Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Format a millisecond duration for tables.
pub(crate) fn format_ms(ms: Option<u64>) -> String {
    match ms {
        None => "-".to_string(),
        Some(ms) if ms < 1_000 => format!("{}ms", ms),
        Some(ms) if ms < 60_000 => format!("{:.1}s", ms as f64 / 1000.0),
        Some(ms) => format!("{}m {}s", ms / 60_000, (ms % 60_000) / 1000),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ms() {
        assert_eq!(format_ms(None), "-");
        assert_eq!(format_ms(Some(250)), "250ms");
        assert_eq!(format_ms(Some(1_500)), "1.5s");
        assert_eq!(format_ms(Some(125_000)), "2m 5s");
    }

    #[test]
    fn test_format_time_none() {
        assert_eq!(format_time(None), "-");
    }

    #[test]
    fn test_build_client_without_endpoint_uses_noop() {
        let config = Config::default();
        assert!(build_client(&config).is_ok());
    }
}
