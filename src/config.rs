//! Command-line configuration and application constants.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

// constants (used as defaults)
/// Where the COVID-19 Data Hub republishes the compressed snapshot daily.
pub const DEFAULT_SNAPSHOT_URL: &str = "https://storage.covid19datahub.io/latest.db.gz";
/// Local directory holding the staged download and the decompressed dataset.
pub const DEFAULT_DATA_DIR: &str = "./files";
/// A snapshot older than this must be refreshed before serving further requests.
pub const DEFAULT_STALENESS_HOURS: u64 = 24;
/// Per-request timeout on the snapshot download (the file is a few hundred MB).
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 300;

/// File name of the staged (still compressed) snapshot inside the data directory.
pub const STAGED_FILE_NAME: &str = "latest.db.gz";
/// File name of the decompressed dataset inside the data directory.
pub const DATASET_FILE_NAME: &str = "latest.db";

/// Hard cap on rows returned by a single query (ten years of daily rows).
pub const ROW_LIMIT: u32 = 3650;

/// Columns appended to every query: the row identifier and the observation date.
pub const BASE_FIELDS: &[&str] = &["timeseries.id", "date"];

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace). Used with the `--log-level` CLI option.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only errors.
    Error,
    /// Errors and warnings.
    Warn,
    /// Errors, warnings, and informational messages (default).
    Info,
    /// Verbose output for debugging.
    Debug,
    /// Extremely verbose output.
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Command-line options and configuration.
///
/// This struct is automatically generated by `clap` from the field attributes.
/// All options have sensible defaults and can be overridden via command-line flags.
///
/// # Examples
///
/// ```bash
/// # Basic usage
/// covidhub_api
///
/// # Custom bind address and data directory
/// covidhub_api --bind 0.0.0.0:8080 --data-dir /var/lib/covidhub
/// ```
#[derive(Debug, Clone, Parser)]
#[command(
    name = "covidhub_api",
    about = "Serves the COVID-19 Data Hub snapshot over HTTP, refreshing it when stale."
)]
pub struct Config {
    /// Address to bind the HTTP server to
    #[arg(long, default_value = "127.0.0.1:5000")]
    pub bind: String,

    /// Directory for the staged download and the decompressed dataset
    #[arg(long, value_parser, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// URL of the compressed snapshot
    #[arg(long, default_value = DEFAULT_SNAPSHOT_URL)]
    pub snapshot_url: String,

    /// Snapshot age in hours beyond which a refresh is triggered
    #[arg(long, default_value_t = DEFAULT_STALENESS_HOURS)]
    pub staleness_hours: u64,

    /// Snapshot download timeout in seconds
    ///
    /// A hung download errors out at this deadline instead of leaving the
    /// refresh in progress indefinitely.
    #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT_SECS)]
    pub fetch_timeout_seconds: u64,

    /// Path of the README served on the documentation route
    #[arg(long, value_parser, default_value = "./README.md")]
    pub readme_path: PathBuf,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind: "127.0.0.1:5000".to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            snapshot_url: DEFAULT_SNAPSHOT_URL.to_string(),
            staleness_hours: DEFAULT_STALENESS_HOURS,
            fetch_timeout_seconds: DEFAULT_FETCH_TIMEOUT_SECS,
            readme_path: PathBuf::from("./README.md"),
            log_level: LogLevel::Info,
        }
    }
}

impl Config {
    /// Path of the staged (compressed) snapshot download.
    pub fn staged_path(&self) -> PathBuf {
        self.data_dir.join(STAGED_FILE_NAME)
    }

    /// Path of the decompressed dataset readers query against.
    pub fn dataset_path(&self) -> PathBuf {
        self.data_dir.join(DATASET_FILE_NAME)
    }

    /// Staleness threshold as a `Duration`.
    pub fn staleness_threshold(&self) -> Duration {
        Duration::from_secs(self.staleness_hours * 3600)
    }

    /// Download timeout as a `Duration`.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_seconds)
    }
}
