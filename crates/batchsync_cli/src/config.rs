//! Layered settings for the batchsync CLI.
//!
//! Later layers win:
//! 1. Built-in defaults
//! 2. `$XDG_CONFIG_HOME/batchsync/config.toml`
//! 3. `./batchsync.toml`
//! 4. `BATCHSYNC_*` environment variables (see [`ENV_KEYS`])
//!
//! Without a configured URL the database lives in the XDG state directory
//! (`~/.local/state/batchsync/batchsync.db` on Linux).
//!
//! ```toml
//! [database]
//! url = "sqlite:///var/lib/batchsync/batchsync.db?mode=rwc"
//!
//! [engine]
//! history_limit = 50
//! busy_policy = "requeue"
//!
//! [engine.adaptive]
//! scale_up_per_minute = 30.0
//!
//! [client]
//! endpoint = "https://sync.example.com/api"
//! requests_per_second = 10
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use batchsync::EngineOptions;
use config::builder::DefaultState;
use config::{ConfigBuilder, File, FileFormat};
use directories::ProjectDirs;
use serde::Deserialize;

const APP_NAME: &str = "batchsync";

/// Environment variables and the settings keys they override.
///
/// Keys contain underscores, so a generic `_`-separated mapping would split
/// `requests_per_second` into nested tables.
pub const ENV_KEYS: &[(&str, &str)] = &[
    ("BATCHSYNC_DATABASE_URL", "database.url"),
    ("BATCHSYNC_CLIENT_ENDPOINT", "client.endpoint"),
    ("BATCHSYNC_CLIENT_TOKEN", "client.token"),
    ("BATCHSYNC_CLIENT_REQUESTS_PER_SECOND", "client.requests_per_second"),
    ("BATCHSYNC_CLIENT_TIMEOUT_SECS", "client.timeout_secs"),
    ("BATCHSYNC_ENGINE_HISTORY_LIMIT", "engine.history_limit"),
    ("BATCHSYNC_ENGINE_DISPATCH_INTERVAL_MS", "engine.dispatch_interval_ms"),
    ("BATCHSYNC_ENGINE_BUSY_POLICY", "engine.busy_policy"),
];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    /// Engine tunables, passed to the engine builder as-is.
    pub engine: EngineOptions,
    pub client: ClientConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite connection URL.
    pub url: Option<String>,
}

/// Downstream account sync service.
///
/// Without an endpoint every account is handed to the no-op client.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL; accounts are posted to `{endpoint}/sync`.
    pub endpoint: Option<String>,
    /// Bearer token sent with every request.
    pub token: Option<String>,
    /// Upper bound on calls per second across all running accounts.
    pub requests_per_second: u32,
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: None,
            requests_per_second: 10,
            timeout_secs: 60,
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load settings from files and the process environment.
    ///
    /// A broken file or value is logged and the defaults are used instead,
    /// so commands like `completions` keep working.
    pub fn load() -> Self {
        let mut files = Vec::new();
        if let Some(path) = Self::default_config_path() {
            files.push(path);
        }
        files.push(PathBuf::from("batchsync.toml"));

        Self::from_layers(&files, |name| std::env::var(name).ok()).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Ignoring invalid configuration");
            Config::default()
        })
    }

    /// Build settings from existing `files` (in order) and an environment lookup.
    fn from_layers(
        files: &[PathBuf],
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        for path in files.iter().filter(|p| p.exists()) {
            tracing::debug!(path = %path.display(), "Loading config file");
            builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Toml));
        }
        apply_env(builder, env)?.build()?.try_deserialize()
    }

    /// The configured database URL, or a SQLite file in the state directory.
    ///
    /// `mode=rwc` lets SQLite create the file on first use.
    pub fn database_url(&self) -> Option<String> {
        if let Some(url) = &self.database.url {
            return Some(url.clone());
        }
        Self::default_state_dir().map(|dir| sqlite_url(&dir.join("batchsync.db")))
    }

    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// `$XDG_STATE_HOME/batchsync` on Linux; the data directory elsewhere.
    pub fn default_state_dir() -> Option<PathBuf> {
        let dirs = ProjectDirs::from("", "", APP_NAME)?;
        Some(
            dirs.state_dir()
                .unwrap_or_else(|| dirs.data_dir())
                .to_path_buf(),
        )
    }
}

fn apply_env(
    mut builder: ConfigBuilder<DefaultState>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
    for (name, key) in ENV_KEYS {
        builder = builder.set_override_option(*key, env(name))?;
    }
    Ok(builder)
}

fn sqlite_url(path: &Path) -> String {
    format!("sqlite://{}?mode=rwc", path.display())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use batchsync::sync::BusyPolicy;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_temp(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("batchsync-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_defaults_without_sources() {
        let config = Config::from_layers(&[], no_env).unwrap();

        assert!(config.database.url.is_none());
        assert_eq!(config.engine, EngineOptions::default());
        assert!(config.client.endpoint.is_none());
        assert_eq!(config.client.requests_per_second, 10);
        assert_eq!(config.client.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_file_sections_fill_engine_and_client() {
        let path = write_temp(
            r#"
            [engine]
            history_limit = 20
            busy_policy = "requeue"

            [engine.adaptive]
            scale_up_per_minute = 60.0

            [client]
            endpoint = "https://sync.example.com"
            requests_per_second = 3
            "#,
        );

        let config = Config::from_layers(std::slice::from_ref(&path), no_env).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.engine.history_limit, 20);
        assert_eq!(config.engine.busy_policy, BusyPolicy::Requeue);
        assert_eq!(config.engine.adaptive.scale_up_per_minute, 60.0);
        assert_eq!(config.engine.adaptive.scale_down_per_minute, 10.0);
        assert_eq!(config.client.endpoint.as_deref(), Some("https://sync.example.com"));
        assert_eq!(config.client.requests_per_second, 3);
        assert_eq!(config.client.timeout_secs, 60);
    }

    #[test]
    fn test_later_file_overrides_earlier() {
        let global = write_temp("[engine]\nhistory_limit = 10\ndispatch_interval_ms = 250");
        let local = write_temp("[engine]\nhistory_limit = 30");

        let config = Config::from_layers(&[global.clone(), local.clone()], no_env).unwrap();
        std::fs::remove_file(&global).unwrap();
        std::fs::remove_file(&local).unwrap();

        assert_eq!(config.engine.history_limit, 30);
        assert_eq!(config.engine.dispatch_interval_ms, 250);
    }

    #[test]
    fn test_env_overrides_multi_word_keys() {
        let path = write_temp("[client]\nrequests_per_second = 3");
        let env: HashMap<&str, &str> = HashMap::from([
            ("BATCHSYNC_CLIENT_REQUESTS_PER_SECOND", "7"),
            ("BATCHSYNC_CLIENT_TOKEN", "secret"),
            ("BATCHSYNC_ENGINE_BUSY_POLICY", "requeue"),
        ]);

        let config = Config::from_layers(std::slice::from_ref(&path), |name| {
            env.get(name).map(|v| v.to_string())
        })
        .unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.client.requests_per_second, 7);
        assert_eq!(config.client.token.as_deref(), Some("secret"));
        assert_eq!(config.engine.busy_policy, BusyPolicy::Requeue);
    }

    #[test]
    fn test_missing_files_are_skipped() {
        let missing = std::env::temp_dir().join("batchsync-does-not-exist.toml");
        assert!(Config::from_layers(&[missing], no_env).is_ok());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let path = write_temp("[engine\nhistory_limit = 1");
        let result = Config::from_layers(std::slice::from_ref(&path), no_env);
        std::fs::remove_file(&path).unwrap();

        assert!(result.is_err());
    }

    #[test]
    fn test_database_url_defaults_to_state_dir() {
        let url = Config::default().database_url().unwrap();

        assert!(url.starts_with("sqlite://"));
        assert!(url.contains("batchsync.db"));
        assert!(url.ends_with("?mode=rwc"));
    }

    #[test]
    fn test_database_url_respects_configured_value() {
        let config = Config::from_layers(&[], |name| {
            (name == "BATCHSYNC_DATABASE_URL").then(|| "sqlite::memory:".to_string())
        })
        .unwrap();

        assert_eq!(config.database_url().as_deref(), Some("sqlite::memory:"));
    }
}
