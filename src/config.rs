use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::Level;

use canton_ledger::LedgerConfig;

#[derive(Parser, Debug)]
pub struct Env {
    /// Path to plaintext TOML configuration file
    #[clap(long)]
    pub config: PathBuf,
}

/// Raw file shape. Optional fields are defaulted in `Config::load`.
#[derive(Deserialize)]
struct RawConfig {
    log_level: Option<LogLevel>,
    server_port: Option<u16>,
    data_dir: Option<PathBuf>,
    ledger: LedgerConfig,
}

/// Runtime configuration assembled from the TOML file.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: LogLevel,
    pub server_port: u16,
    /// Directory holding the off-chain mirror's JSON files.
    pub data_dir: PathBuf,
    pub ledger: LedgerConfig,
}

impl Config {
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::load(&raw)
    }

    pub fn load(config_toml: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(config_toml)?;
        Ok(Self {
            log_level: raw.log_level.unwrap_or(LogLevel::Debug),
            server_port: raw.server_port.unwrap_or(8080),
            data_dir: raw.data_dir.unwrap_or_else(|| PathBuf::from("./data")),
            ledger: raw.ledger,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

impl From<&LogLevel> for Level {
    fn from(log_level: &LogLevel) -> Self {
        match log_level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

pub fn setup_tracing(log_level: &LogLevel) {
    let level: Level = log_level.into();
    let default_filter = format!("canton_gateway={level},canton_ledger={level}");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}
