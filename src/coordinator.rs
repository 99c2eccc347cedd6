//! Single-flight refresh coordination.
//!
//! The coordinator owns the refresh state machine (`Idle` -> `InProgress`
//! -> `Idle`) and the snapshot paths. Every gated request calls
//! [`RefreshCoordinator::ensure_fresh`] before touching the dataset; at most
//! one caller per cycle runs the download + decompress pipeline, everyone
//! else gets an immediate busy signal. The state lock is held only for the
//! check-and-transition, never across the network call, so fresh-path
//! requests are not serialized behind a slow download.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use log::{error, info};

use crate::config::Config;
use crate::decompress::decompress_snapshot;
use crate::error_handling::RefreshError;
use crate::fetch::fetch_snapshot;
use crate::freshness::{self, Freshness};

/// Process-wide refresh state, guarded by the coordinator's mutex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    /// No refresh cycle is running.
    Idle,
    /// One caller is executing the download + decompress pipeline.
    InProgress,
}

/// What a gated request is allowed to do next.
#[derive(Debug)]
pub enum GateOutcome {
    /// The snapshot is current; the caller may read it.
    Proceed,
    /// Another request is refreshing; the caller should return 503.
    Busy,
    /// This caller ran the refresh and it failed; state is back to idle and
    /// the next request will retry.
    FailedRefresh(RefreshError),
}

/// Owns the snapshot and serializes refresh attempts.
///
/// Injected into request handlers via `Arc`; there is no process-global
/// state.
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    client: reqwest::Client,
    snapshot_url: String,
    staged_path: PathBuf,
    dataset_path: PathBuf,
    staleness_threshold: Duration,
}

impl RefreshCoordinator {
    /// Builds a coordinator in the `Idle` state; nothing is downloaded
    /// until the first gated request finds the snapshot stale or missing.
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        RefreshCoordinator {
            state: Mutex::new(RefreshState::Idle),
            client,
            snapshot_url: config.snapshot_url.clone(),
            staged_path: config.staged_path(),
            dataset_path: config.dataset_path(),
            staleness_threshold: config.staleness_threshold(),
        }
    }

    /// Path of the dataset readers should open after a `Proceed`.
    pub fn dataset_path(&self) -> &Path {
        &self.dataset_path
    }

    /// Whether a refresh cycle is currently running.
    pub fn is_refreshing(&self) -> bool {
        *self.lock_state() == RefreshState::InProgress
    }

    /// Gate for every inbound status or data request.
    ///
    /// Checks the state and the snapshot age under the lock, then (if this
    /// caller won the transition) runs the fetch + decompress pipeline
    /// outside it. A failed pipeline resets to idle; the next poll retries.
    pub async fn ensure_fresh(&self) -> GateOutcome {
        {
            let mut state = self.lock_state();
            if *state == RefreshState::InProgress {
                return GateOutcome::Busy;
            }
            match freshness::evaluate(&self.dataset_path, self.staleness_threshold) {
                Ok(Freshness::Fresh) => return GateOutcome::Proceed,
                Ok(Freshness::Stale) => info!("Local snapshot is stale, refreshing"),
                Ok(Freshness::Missing) => info!("No local snapshot, downloading"),
                Err(e) => return GateOutcome::FailedRefresh(RefreshError::Io(e)),
            }
            *state = RefreshState::InProgress;
        }

        // The guard resets to Idle on every exit path, including this future
        // being dropped by a client disconnect; an abandoned refresh must
        // not strand the state in InProgress.
        let _reset = ResetToIdle(self);

        match self.run_pipeline().await {
            Ok(()) => GateOutcome::Proceed,
            Err(e) => {
                error!("Snapshot refresh failed: {}", e);
                GateOutcome::FailedRefresh(e)
            }
        }
    }

    async fn run_pipeline(&self) -> Result<(), RefreshError> {
        fetch_snapshot(&self.client, &self.snapshot_url, &self.staged_path).await?;

        let src = self.staged_path.clone();
        let dest = self.dataset_path.clone();
        tokio::task::spawn_blocking(move || decompress_snapshot(&src, &dest)).await??;

        info!("Snapshot refreshed at {}", self.dataset_path.display());
        Ok(())
    }

    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        // A poisoned lock means some holder panicked, but the enum value
        // itself is always valid; recover rather than propagate the panic.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

struct ResetToIdle<'a>(&'a RefreshCoordinator);

impl Drop for ResetToIdle<'_> {
    fn drop(&mut self) {
        *self.0.lock_state() = RefreshState::Idle;
    }
}
