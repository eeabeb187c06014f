//! Configuration management commands.
//!
//! Commands for managing sync configurations (create, list, show, update,
//! delete, enable, disable).

use clap::Subcommand;
use console::style;
use tabled::{Table, Tabled, settings::Style};
use uuid::Uuid;

use batchsync::sync::{BatchSyncConfig, ConfigPatch, ConfigSpec, SyncPolicy};
use batchsync::{BatchSyncEngine, Priority, SyncMode};

use super::OutputFormat;
use super::shared::{format_time, print_ok, require_config};

/// Policy flags shared by `create` and `update`.
#[derive(Debug, Clone, Default, clap::Args)]
pub(crate) struct PolicyArgs {
    /// Execution strategy (sequential, parallel, adaptive)
    #[arg(short, long)]
    mode: Option<SyncMode>,

    /// Maximum accounts synced at once
    #[arg(short = 'c', long)]
    max_concurrent: Option<usize>,

    /// Retries after the first failed attempt
    #[arg(short = 'r', long)]
    max_retries: Option<u32>,

    /// Base delay of the linear retry backoff, in milliseconds
    #[arg(long)]
    retry_delay_ms: Option<u64>,

    /// Per-account timeout in milliseconds (0 disables it)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Pause between accounts or chunks, in milliseconds
    #[arg(long)]
    rate_limit_delay_ms: Option<u64>,

    /// Default queue priority (low, medium, high)
    #[arg(short, long)]
    priority: Option<Priority>,

    /// Record completed accounts below this confidence as skipped
    #[arg(long)]
    min_confidence: Option<f64>,

    /// Always ask the client not to write downstream
    #[arg(long)]
    dry_run: Option<bool>,
}

impl PolicyArgs {
    fn apply(self, policy: &mut SyncPolicy) {
        if let Some(mode) = self.mode {
            policy.sync_mode = mode;
        }
        if let Some(max) = self.max_concurrent {
            policy.max_concurrent_accounts = max;
        }
        if let Some(retries) = self.max_retries {
            policy.max_retries = retries;
        }
        if let Some(delay) = self.retry_delay_ms {
            policy.retry_delay_ms = delay;
        }
        if let Some(timeout) = self.timeout_ms {
            policy.timeout_ms = timeout;
        }
        if let Some(delay) = self.rate_limit_delay_ms {
            policy.rate_limit_delay_ms = delay;
        }
        if let Some(priority) = self.priority {
            policy.priority = priority;
        }
        if let Some(min) = self.min_confidence {
            policy.conditions.min_confidence = Some(min);
        }
        if let Some(dry_run) = self.dry_run {
            policy.conditions.dry_run = dry_run;
        }
    }

    /// Express the flags as a patch against `current`.
    fn into_patch(self, current: &SyncPolicy) -> ConfigPatch {
        let conditions = (self.min_confidence.is_some() || self.dry_run.is_some()).then(|| {
            let mut conditions = current.conditions.clone();
            if let Some(min) = self.min_confidence {
                conditions.min_confidence = Some(min);
            }
            if let Some(dry_run) = self.dry_run {
                conditions.dry_run = dry_run;
            }
            conditions
        });

        ConfigPatch {
            sync_mode: self.mode,
            max_concurrent_accounts: self.max_concurrent,
            max_retries: self.max_retries,
            retry_delay_ms: self.retry_delay_ms,
            timeout_ms: self.timeout_ms,
            rate_limit_delay_ms: self.rate_limit_delay_ms,
            priority: self.priority,
            conditions,
            ..ConfigPatch::default()
        }
    }
}

/// Configuration management subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Create a new sync configuration
    Create {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Account ids, comma separated
        #[arg(short, long, value_delimiter = ',')]
        accounts: Vec<String>,

        /// Create the configuration disabled
        #[arg(long)]
        disabled: bool,

        #[command(flatten)]
        policy: PolicyArgs,
    },
    /// List all configurations
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Show details of a configuration
    Show {
        /// Configuration id
        id: Uuid,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Update a configuration
    Update {
        /// Configuration id
        id: Uuid,

        /// New display name
        #[arg(long)]
        name: Option<String>,

        /// Replace the account ids, comma separated
        #[arg(short, long, value_delimiter = ',')]
        accounts: Option<Vec<String>>,

        #[command(flatten)]
        policy: PolicyArgs,
    },
    /// Delete a configuration and its history
    Delete {
        /// Configuration id
        id: Uuid,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Enable a configuration
    Enable {
        /// Configuration id
        id: Uuid,
    },
    /// Disable a configuration (queued runs are skipped)
    Disable {
        /// Configuration id
        id: Uuid,
    },
}

/// Display struct for configuration listing.
#[derive(Debug, Clone, serde::Serialize, Tabled)]
struct ConfigDisplay {
    #[tabled(rename = "ID")]
    id: Uuid,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Enabled")]
    enabled: bool,
    #[tabled(rename = "Mode")]
    mode: SyncMode,
    #[tabled(rename = "Priority")]
    priority: Priority,
    #[tabled(rename = "Accounts")]
    accounts: usize,
    #[tabled(rename = "Last Sync")]
    last_sync: String,
    #[tabled(rename = "Last Status")]
    last_status: String,
}

impl From<&BatchSyncConfig> for ConfigDisplay {
    fn from(config: &BatchSyncConfig) -> Self {
        Self {
            id: config.id,
            name: config.name.clone(),
            enabled: config.enabled,
            mode: config.policy.sync_mode,
            priority: config.policy.priority,
            accounts: config.account_ids.len(),
            last_sync: format_time(config.last_sync),
            last_status: config
                .last_result()
                .map(|r| r.status.to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Handle configuration management commands.
pub async fn handle_config(
    action: ConfigAction,
    engine: &BatchSyncEngine,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Create {
            name,
            accounts,
            disabled,
            policy,
        } => {
            let mut spec = ConfigSpec::new(name, accounts);
            policy.apply(&mut spec.policy);
            if disabled {
                spec = spec.disabled();
            }
            let config = engine.create_config(spec).await?;
            print_ok(format!(
                "Created configuration '{}' ({}, {} accounts)",
                style(&config.name).cyan(),
                config.id,
                config.account_ids.len()
            ));
        }
        ConfigAction::List { output } => list_configs(engine, output)?,
        ConfigAction::Show { id, output } => show_config(engine, id, output)?,
        ConfigAction::Update {
            id,
            name,
            accounts,
            policy,
        } => {
            let current = require_config(engine, id)?;
            let patch = ConfigPatch {
                name,
                account_ids: accounts,
                ..policy.into_patch(&current.policy)
            };
            if patch.is_empty() {
                println!("Nothing to update.");
                return Ok(());
            }
            let config = engine.update_config(id, patch).await?;
            print_ok(format!("Updated configuration '{}'", style(&config.name).cyan()));
        }
        ConfigAction::Delete { id, yes } => delete_config(engine, id, yes).await?,
        ConfigAction::Enable { id } => set_enabled(engine, id, true).await?,
        ConfigAction::Disable { id } => set_enabled(engine, id, false).await?,
    }
    Ok(())
}

fn list_configs(
    engine: &BatchSyncEngine,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let configs = engine.get_configs();

    if configs.is_empty() && matches!(output, OutputFormat::Table) {
        println!("No configurations.");
        println!();
        println!("Create one with:");
        println!("  batchsync config create --name nightly --accounts a,b,c");
        return Ok(());
    }

    let displays: Vec<ConfigDisplay> = configs.iter().map(ConfigDisplay::from).collect();

    match output {
        OutputFormat::Table => {
            let mut table = Table::new(displays);
            table.with(Style::rounded());
            println!("{}", table);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&displays)?);
        }
    }

    Ok(())
}

fn show_config(
    engine: &BatchSyncEngine,
    id: Uuid,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = require_config(engine, id)?;

    match output {
        OutputFormat::Table => {
            let mut table = Table::new(config_details(&config));
            table.with(Style::rounded());
            println!("{}", table);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

#[derive(Debug, serde::Serialize, Tabled)]
struct ConfigDetail {
    #[tabled(rename = "Property")]
    property: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn config_details(config: &BatchSyncConfig) -> Vec<ConfigDetail> {
    let policy = &config.policy;
    let detail = |property, value: String| ConfigDetail { property, value };

    vec![
        detail("Name", config.name.clone()),
        detail("ID", config.id.to_string()),
        detail("Enabled", config.enabled.to_string()),
        detail("Mode", policy.sync_mode.to_string()),
        detail("Priority", policy.priority.to_string()),
        detail("Max Concurrent", policy.max_concurrent_accounts.to_string()),
        detail("Max Retries", policy.max_retries.to_string()),
        detail("Retry Delay", format!("{}ms", policy.retry_delay_ms)),
        detail(
            "Timeout",
            if policy.timeout_ms == 0 {
                "none".to_string()
            } else {
                format!("{}ms", policy.timeout_ms)
            },
        ),
        detail("Rate Limit Delay", format!("{}ms", policy.rate_limit_delay_ms)),
        detail("Dry Run", policy.conditions.dry_run.to_string()),
        detail(
            "Min Confidence",
            policy
                .conditions
                .min_confidence
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ),
        detail("Accounts", config.account_ids.join(", ")),
        detail("Runs Recorded", config.sync_history.len().to_string()),
        detail("Last Sync", format_time(config.last_sync)),
        detail("Next Sync", format_time(config.next_sync)),
        detail("Created", format_time(Some(config.created_at))),
        detail("Updated", format_time(Some(config.updated_at))),
    ]
}

async fn delete_config(
    engine: &BatchSyncEngine,
    id: Uuid,
    skip_confirm: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = require_config(engine, id)?;

    if !skip_confirm {
        println!(
            "{} About to delete configuration '{}' and {} recorded run{}",
            style("⚠").yellow().bold(),
            style(&config.name).cyan(),
            config.sync_history.len(),
            if config.sync_history.len() == 1 { "" } else { "s" }
        );

        print!("Continue? [y/N] ");
        use std::io::{self, Write};
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    engine.delete_config(id).await?;
    print_ok(format!("Deleted configuration '{}'", style(&config.name).cyan()));
    Ok(())
}

async fn set_enabled(
    engine: &BatchSyncEngine,
    id: Uuid,
    enabled: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let patch = ConfigPatch {
        enabled: Some(enabled),
        ..ConfigPatch::default()
    };
    let config = engine.update_config(id, patch).await?;
    print_ok(format!(
        "{} configuration '{}'",
        if enabled { "Enabled" } else { "Disabled" },
        style(&config.name).cyan()
    ));
    Ok(())
}
