//! batchsync CLI - command-line interface for the batch sync engine.

mod commands;
mod config;
mod progress;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::Term;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use batchsync::sync::ExecuteOptions;

use crate::commands::OutputFormat;
use crate::commands::configs::ConfigAction;
use crate::commands::queue::QueueRequest;

#[derive(Parser)]
#[command(name = "batchsync")]
#[command(version)]
#[command(about = "Batch account synchronization engine")]
#[command(
    long_about = "batchsync runs stored sync configurations over lists of accounts, one at a \
time, in parallel chunks, or with an adaptive chunk size tuned from measured throughput. \
Every run is recorded with per-account results and summary statistics."
)]
#[command(after_long_help = r#"EXAMPLES
    Create a configuration:
        $ batchsync config create --name nightly --accounts acme,globex,initech --mode adaptive

    Run it now, cancelling cleanly with Ctrl+C:
        $ batchsync run 5f0c...e2

    Queue several configurations by priority and wait for them:
        $ batchsync queue 5f0c...e2:high 91ab...07:low

    Show statistics:
        $ batchsync stats

    Generate shell completions:
        $ batchsync completions bash > ~/.local/share/bash-completion/completions/batchsync

CONFIGURATION
    batchsync reads configuration from:
      1. ~/.config/batchsync/config.toml (or $XDG_CONFIG_HOME/batchsync/config.toml)
      2. ./batchsync.toml
      3. Environment variables (BATCHSYNC_* prefix, e.g., BATCHSYNC_DATABASE_URL)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    BATCHSYNC_DATABASE_URL      Database connection string (default: ~/.local/state/batchsync/batchsync.db)
    BATCHSYNC_CLIENT_ENDPOINT   Base URL of the account sync service (default: no-op client)
    BATCHSYNC_CLIENT_TOKEN      Bearer token for the account sync service
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage sync configurations
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Run a configuration now and wait for the result
    Run {
        /// Configuration id
        id: Uuid,

        /// Run even if the configuration is disabled
        #[arg(short, long)]
        force: bool,

        /// Ask the client not to write anything downstream
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Only sync these accounts, comma separated
        #[arg(short, long, value_delimiter = ',')]
        accounts: Option<Vec<String>>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Queue configurations by priority and wait until all have run
    Queue {
        /// Entries as ID or ID:PRIORITY (low, medium, high)
        #[arg(required = true, value_name = "ID[:PRIORITY]")]
        entries: Vec<QueueRequest>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Show engine-wide or per-configuration statistics
    Stats {
        /// Configuration id (engine-wide when omitted)
        id: Option<Uuid>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Show recorded runs of a configuration, newest first
    History {
        /// Configuration id
        id: Uuid,

        /// Only show the latest N runs
        #[arg(short = 'l', long)]
        limit: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Output directory for man pages (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// Show migration status
    Status,
    /// Fresh install - drop all tables and reapply migrations
    Fresh,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Ctrl+C cancels running syncs; a second one force-quits
    shutdown::setup_shutdown_handler();

    // Structured logging when not attached to a terminal
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("batchsync=info,batchsync_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    // Load configuration (config file -> env vars -> defaults)
    let config = config::Config::load();

    let cli = Cli::parse();

    // Handle commands that don't require database access first
    match &cli.command {
        Commands::Completions { shell } => {
            commands::meta::handle_completions(*shell)?;
            return Ok(());
        }
        Commands::Man { output } => {
            commands::meta::handle_man(output.clone())?;
            return Ok(());
        }
        _ => {}
    }

    let database_url = config
        .database_url()
        .ok_or("Could not determine a database URL; set BATCHSYNC_DATABASE_URL")?;
    ensure_sqlite_parent_dir(&database_url)?;

    match cli.command {
        Commands::Migrate { action } => {
            commands::migrate::handle_migrate(action, &database_url).await?;
        }
        Commands::Config { action } => {
            let session = commands::shared::open_engine(&config, &database_url, false).await?;
            commands::configs::handle_config(action, &session.engine).await?;
        }
        Commands::Run {
            id,
            force,
            dry_run,
            accounts,
            output,
        } => {
            let session = commands::shared::open_engine(&config, &database_url, true).await?;
            let options = ExecuteOptions {
                force,
                dry_run,
                account_ids: accounts,
            };
            commands::run::handle_run(session, id, options, output).await?;
        }
        Commands::Queue { entries, output } => {
            let session = commands::shared::open_engine(&config, &database_url, true).await?;
            commands::queue::handle_queue(session, entries, output).await?;
        }
        Commands::Stats { id, output } => {
            let session = commands::shared::open_engine(&config, &database_url, false).await?;
            commands::stats::handle_stats(&session.engine, id, output)?;
        }
        Commands::History { id, limit, output } => {
            let session = commands::shared::open_engine(&config, &database_url, false).await?;
            commands::history::handle_history(&session.engine, id, limit, output)?;
        }
        Commands::Completions { .. } | Commands::Man { .. } => {}
    }

    if shutdown::is_shutdown_requested() {
        tracing::debug!("Exiting after shutdown request");
    }

    Ok(())
}

/// Ensure the database directory exists for SQLite.
fn ensure_sqlite_parent_dir(database_url: &str) -> std::io::Result<()> {
    let Some(db_path) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    // Strip query parameters (e.g., ?mode=rwc) before path operations
    let db_path = db_path.split('?').next().unwrap_or(db_path);
    let db_path = std::path::Path::new(db_path);

    if db_path.is_relative() && !db_path.as_os_str().is_empty() {
        tracing::warn!(
            "Database path '{}' is relative - behavior depends on current directory. \
             Consider using an absolute path.",
            db_path.display()
        );
    }

    match db_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
