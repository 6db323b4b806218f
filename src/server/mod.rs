//! HTTP surface over the resolution engine.

pub mod error;
pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::core::{RedirectProbe, UpstreamResolver};
use crate::engine::Engine;

/// Engine with its collaborators behind trait objects, as shared by every request.
pub type SharedEngine = Engine<Arc<dyn RedirectProbe>, Arc<dyn UpstreamResolver>>;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SharedEngine>,
    pub request_budget: Duration,
}

impl AppState {
    pub fn new(engine: SharedEngine, request_budget: Duration) -> Self {
        Self {
            engine: Arc::new(engine),
            request_budget,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/resolve", get(handlers::resolve))
        .route("/api/tik.json", get(handlers::resolve))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds `bind` and serves until Ctrl-C.
pub async fn serve(state: AppState, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    info!(
        target: "tiklink::server",
        addr = %listener.local_addr().context("reading bound address")?,
        "listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving http")?;

    info!(target: "tiklink::server", "server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(target: "tiklink::server", error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!(target: "tiklink::server", "received shutdown signal");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LinkDefaults, UpstreamResponse};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tower::ServiceExt;

    const ID: &str = "7123456789012345678";

    struct NoProbe;

    #[async_trait]
    impl RedirectProbe for NoProbe {
        async fn resolve_redirect(&self, _link: &str) -> anyhow::Result<String> {
            Err(anyhow!("network disabled in tests"))
        }
    }

    /// Answers by link; unknown links get a structural error.
    #[derive(Default)]
    struct TableUpstream {
        answers: HashMap<String, Value>,
        delay: Option<Duration>,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl UpstreamResolver for TableUpstream {
        async fn fetch(&self, link: &str, _version: &str) -> anyhow::Result<UpstreamResponse> {
            *self.calls.lock().unwrap() += 1;
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let answer = self
                .answers
                .get(link)
                .cloned()
                .unwrap_or_else(|| json!({"status": "error", "message": "Video unavailable"}));
            Ok(serde_json::from_value(answer)?)
        }
    }

    fn app(upstream: Arc<TableUpstream>, budget: Duration) -> Router {
        let probe: Arc<dyn RedirectProbe> = Arc::new(NoProbe);
        let upstream: Arc<dyn UpstreamResolver> = upstream;
        let engine = Engine::new(probe, upstream, "v3", LinkDefaults::default());
        router(AppState::new(engine, budget))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_version() {
        let (status, body) = get_json(
            app(Arc::default(), Duration::from_secs(5)),
            "/health",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn missing_url_is_rejected() {
        for uri in ["/api/resolve", "/api/resolve?url=%20%20"] {
            let (status, body) = get_json(app(Arc::default(), Duration::from_secs(5)), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, json!({"status": "error", "error": "url is required"}));
        }
    }

    #[tokio::test]
    async fn foreign_url_is_a_validation_error() {
        let upstream = Arc::new(TableUpstream::default());
        let (status, body) = get_json(
            app(upstream.clone(), Duration::from_secs(5)),
            "/api/resolve?url=https%3A%2F%2Fexample.com%2Fvideo%2F1",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "Invalid TikTok URL format. Please provide a valid TikTok URL."
        );
        assert_eq!(*upstream.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn legacy_route_returns_descriptor() {
        let upstream = Arc::new(TableUpstream {
            answers: HashMap::from([(
                format!("https://www.tiktok.com/@dancer/video/{ID}"),
                json!({
                    "status": "success",
                    "result": {
                        "author": {"nickname": "dancer"},
                        "videoSD": "https://cdn.example/sd.mp4"
                    }
                }),
            )]),
            ..Default::default()
        });
        let uri = format!(
            "/api/tik.json?url=watch%20https%3A%2F%2Fwww.tiktok.com%2F%40dancer%2Fvideo%2F{ID}%3Fis_from_webapp%3D1"
        );
        let (status, body) = get_json(app(upstream, Duration::from_secs(5)), &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["result"]["author"]["nickname"], "dancer");
        assert_eq!(body["result"]["videoSD"], "https://cdn.example/sd.mp4");
        assert_eq!(body["result"]["uploadDate"], Value::Null);
    }

    #[tokio::test]
    async fn exhausted_variants_are_a_server_error() {
        let upstream = Arc::new(TableUpstream::default());
        let uri = format!("/api/resolve?url=https%3A%2F%2Fwww.tiktok.com%2F%40a%2Fvideo%2F{ID}");
        let (status, body) = get_json(app(upstream.clone(), Duration::from_secs(5)), &uri).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "API returned: error - Video unavailable");
        assert!(*upstream.calls.lock().unwrap() > 1);
    }

    #[tokio::test]
    async fn request_budget_stops_the_variant_loop() {
        let upstream = Arc::new(TableUpstream {
            delay: Some(Duration::from_millis(200)),
            ..Default::default()
        });
        let uri = format!("/api/resolve?url=https%3A%2F%2Fwww.tiktok.com%2F%40a%2Fvideo%2F{ID}");
        let (status, _) = get_json(app(upstream.clone(), Duration::from_millis(20)), &uri).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(*upstream.calls.lock().unwrap(), 1);
    }
}
