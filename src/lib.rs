//! covidhub_api library: a queryable HTTP view over the COVID-19 Data Hub
//! snapshot.
//!
//! The dataset is republished daily as a gzip-compressed SQLite file. This
//! crate keeps a local copy and refreshes it at most once per staleness
//! window: the first request that finds the snapshot stale (or missing)
//! downloads and decompresses a new copy while every concurrent request
//! gets an immediate busy signal, and the finished dataset is swapped in by
//! atomic rename so readers never see a half-written file.
//!
//! # Example
//!
//! ```no_run
//! use covidhub_api::{run_server, Config};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     bind: "127.0.0.1:5000".to_string(),
//!     ..Default::default()
//! };
//! run_server(config).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your
//! application or ensure you're calling library functions within an async
//! context.

#![warn(missing_docs)]

pub mod config;
pub mod coordinator;
mod decompress;
pub mod error_handling;
mod fetch;
mod freshness;
pub mod initialization;
pub mod query;
pub mod server;
mod storage;

// Re-export public API
pub use config::{Config, LogLevel};
pub use coordinator::{GateOutcome, RefreshCoordinator, RefreshState};
pub use run::run_server;
pub use server::{AppState, router};

// Internal run module (server assembly)
mod run {
    use std::sync::Arc;

    use anyhow::{Context, Result};
    use log::info;

    use crate::config::Config;
    use crate::coordinator::RefreshCoordinator;
    use crate::initialization::init_client;
    use crate::server::{serve, AppState};

    /// Assembles the refresh coordinator and runs the HTTP server.
    ///
    /// This is the main entry point for the library. The snapshot is not
    /// downloaded eagerly; the first gated request triggers the initial
    /// refresh.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the listen
    /// address cannot be bound.
    pub async fn run_server(config: Config) -> Result<()> {
        let client =
            init_client(config.fetch_timeout()).context("Failed to initialize HTTP client")?;
        let coordinator = Arc::new(RefreshCoordinator::new(client, &config));

        info!(
            "Serving snapshot from {} (refresh after {}h)",
            config.dataset_path().display(),
            config.staleness_hours
        );

        let state = AppState {
            coordinator,
            readme_path: config.readme_path.clone(),
        };
        serve(&config.bind, state).await
    }
}
