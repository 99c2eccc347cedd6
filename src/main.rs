//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `covidhub_api` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use covidhub_api::initialization::init_logger;
use covidhub_api::{run_server, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists)
    let _ = dotenvy::dotenv();

    // Parse command-line arguments into Config
    let config = Config::parse();

    // Initialize logger based on config
    let log_level = config.log_level.clone();
    init_logger(log_level.into()).context("Failed to initialize logger")?;

    if let Err(e) = run_server(config).await {
        eprintln!("covidhub_api error: {:#}", e);
        process::exit(1);
    }
    Ok(())
}
