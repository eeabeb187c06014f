use clap::ValueEnum;

pub(crate) mod configs;
pub(crate) mod history;
pub(crate) mod meta;
pub(crate) mod migrate;
pub(crate) mod queue;
pub(crate) mod run;
pub(crate) mod shared;
pub(crate) mod stats;

/// Output format for listings and reports.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}
