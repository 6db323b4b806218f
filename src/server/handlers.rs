use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::core::Envelope;
use crate::error::ResolveError;
use crate::telemetry::ResolveMonitor;

#[derive(Debug, Deserialize)]
pub struct ResolveParams {
    pub url: Option<String>,
}

/// `GET /api/resolve?url=<text>`, also mounted at the legacy `/api/tik.json`.
pub async fn resolve(
    State(state): State<AppState>,
    params: Result<Query<ResolveParams>, QueryRejection>,
) -> ApiResult<Json<Envelope>> {
    let Query(params) = params.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let text = params.url.unwrap_or_default();
    if text.trim().is_empty() {
        return Err(ResolveError::Empty.into());
    }

    let monitor = ResolveMonitor::new();
    let cancel = CancellationToken::new();
    // Fires when the handler returns or its future is dropped on disconnect.
    let _guard = cancel.clone().drop_guard();
    spawn_budget(cancel.clone(), state.request_budget);

    let outcome = state.engine.resolve(&text, &monitor, &cancel).await;
    debug!(target: "tiklink::server", summary = ?monitor.summarize(), "resolution finished");

    let descriptor = outcome?;
    Ok(Json(Envelope::Success { result: descriptor }))
}

fn spawn_budget(cancel: CancellationToken, budget: std::time::Duration) {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(budget) => {
                warn!(
                    target: "tiklink::server",
                    budget = %humantime::format_duration(budget),
                    "request budget elapsed; no further variants will be tried"
                );
                cancel.cancel();
            }
        }
    });
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
