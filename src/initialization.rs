//! Process-level setup: logging and the shared HTTP client.

use std::time::Duration;

use log::LevelFilter;
use reqwest::ClientBuilder;

/// Initializes the global logger at the given level.
///
/// Respects `RUST_LOG` when set; the CLI level acts as the default filter.
pub fn init_logger(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.to_string()))
        .try_init()
}

/// Builds the shared HTTP client used for snapshot downloads.
///
/// The request timeout bounds the whole download; a hung transfer errors
/// out instead of holding the refresh open indefinitely.
pub fn init_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    ClientBuilder::new().timeout(timeout).build()
}
