//! HTTP surface: routing, the dataset gateway prologue, and response shaping.
//!
//! Every data or status request passes through the refresh coordinator
//! before touching the snapshot. Documentation and redirect routes bypass
//! the gate.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{RawQuery, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use log::{error, warn};
use url::form_urlencoded;

use crate::coordinator::{GateOutcome, RefreshCoordinator};
use crate::error_handling::QueryError;
use crate::query::{self, QuerySpec};
use crate::storage;

/// Body served when the snapshot is current.
pub const MSG_READY: &str = "Download concluído!";
/// Body served while a refresh is running.
pub const MSG_IN_PROGRESS: &str = "Download em andamento...";
/// Body served when the refresh this request triggered failed.
pub const MSG_FAILED: &str = "Falha no download!";

/// Shared state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    /// Gate consulted before every status or data request.
    pub coordinator: Arc<RefreshCoordinator>,
    /// README served on the documentation route.
    pub readme_path: PathBuf,
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api", get(api_docs))
        .route("/api/status", get(status))
        .route("/api/consultar", get(consultar))
        .with_state(state)
}

/// Binds `addr` and serves the router until the process exits.
pub async fn serve(addr: &str, state: AppState) -> Result<(), anyhow::Error> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind server to {}: {}", addr, e))?;

    log::info!("Listening on http://{}/", addr);
    log::info!("  - Docs:   http://{}/api", addr);
    log::info!("  - Status: http://{}/api/status", addr);
    log::info!("  - Query:  http://{}/api/consultar", addr);

    axum::serve(listener, router(state))
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}

async fn root() -> Redirect {
    Redirect::permanent("/api")
}

/// Serves the README on the documentation route. Markdown is delivered
/// as-is; rendering is left to the client.
async fn api_docs(State(state): State<AppState>) -> Response {
    match tokio::fs::read_to_string(&state.readme_path).await {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
            text,
        )
            .into_response(),
        Err(e) => {
            warn!("Failed to read README at {:?}: {}", state.readme_path, e);
            (StatusCode::NOT_FOUND, "Documentation unavailable").into_response()
        }
    }
}

async fn status(State(state): State<AppState>) -> Response {
    match state.coordinator.ensure_fresh().await {
        GateOutcome::Proceed => (StatusCode::OK, MSG_READY).into_response(),
        GateOutcome::Busy => (StatusCode::SERVICE_UNAVAILABLE, MSG_IN_PROGRESS).into_response(),
        GateOutcome::FailedRefresh(e) => {
            error!("Refresh triggered by status request failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, MSG_FAILED).into_response()
        }
    }
}

async fn consultar(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Response {
    match state.coordinator.ensure_fresh().await {
        GateOutcome::Proceed => {}
        GateOutcome::Busy => {
            return (StatusCode::SERVICE_UNAVAILABLE, MSG_IN_PROGRESS).into_response()
        }
        GateOutcome::FailedRefresh(e) => {
            error!("Refresh triggered by query request failed: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, MSG_FAILED).into_response();
        }
    }

    let spec = match parse_query_spec(raw.as_deref().unwrap_or("")) {
        Ok(spec) => spec,
        Err(message) => return (StatusCode::BAD_REQUEST, message).into_response(),
    };

    let built = match query::build(&spec) {
        Ok(built) => built,
        Err(e @ QueryError::Sql(_)) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    match storage::run_query(state.coordinator.dataset_path(), &built).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Parses the request query string into a [`QuerySpec`].
///
/// `campos[]` may repeat; the remaining parameters are scalar. Parameters
/// outside the known set are ignored.
fn parse_query_spec(raw: &str) -> Result<QuerySpec, String> {
    let mut spec = QuerySpec::default();

    for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
        match key.as_ref() {
            "campos[]" | "campos" => spec.fields.push(value.into_owned()),
            "level" => {
                let level = value
                    .parse::<u8>()
                    .map_err(|_| format!("invalid level: {value:?}"))?;
                spec.level = Some(level);
            }
            "location" => spec.location = Some(value.into_owned()),
            "start_date" => spec.start_date = Some(value.into_owned()),
            "end_date" => spec.end_date = Some(value.into_owned()),
            // Unrecognized parameters are ignored rather than rejected.
            _ => {}
        }
    }

    Ok(spec)
}
