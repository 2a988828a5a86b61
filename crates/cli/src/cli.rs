use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Synchronize REST API entities into SQLite tables.
#[derive(Debug, Parser)]
#[command(name = "restsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Sync configuration file (JSON or TOML)
    #[arg(short, long, env = "RESTSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Token configuration file holding the refresh state
    #[arg(short, long, env = "RESTSYNC_TOKEN_CONFIG")]
    pub token_config: Option<PathBuf>,

    /// Only synchronize this entity (repeatable)
    #[arg(short, long = "entity", value_name = "NAME")]
    pub entities: Vec<String>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}
