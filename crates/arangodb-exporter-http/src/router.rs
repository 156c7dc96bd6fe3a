use std::sync::Arc;

use arangodb_exporter_stats::{Collector, PassthroughClient};
use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers;

/// How `/metrics` is answered.
pub enum ExportMode {
    /// Translate `/_admin/statistics` on every request.
    Internal(Arc<Collector>),
    /// Forward `/_admin/metrics` verbatim.
    Passthru(Arc<PassthroughClient>),
}

pub struct ExporterState {
    pub mode: ExportMode,
}

impl ExporterState {
    pub fn internal(collector: Arc<Collector>) -> Self {
        Self {
            mode: ExportMode::Internal(collector),
        }
    }

    pub fn passthru(passthrough: Arc<PassthroughClient>) -> Self {
        Self {
            mode: ExportMode::Passthru(passthrough),
        }
    }
}

pub fn exporter_router(state: Arc<ExporterState>) -> Router {
    Router::new()
        .route("/", get(handlers::landing::landing_page))
        .route("/metrics", get(handlers::metrics::prometheus_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use arangodb_exporter_auth::NoAuthentication;
    use arangodb_exporter_common::error::Result;
    use arangodb_exporter_metrics::MetricsRegistry;
    use arangodb_exporter_stats::{
        Collector, ExporterConfig, NAMESPACE, PassthroughClient, StatisticsClient,
        StatisticsDescription, StatisticsDocument,
    };
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;

    use super::{ExporterState, exporter_router};

    struct StaticClient;

    #[async_trait]
    impl StatisticsClient for StaticClient {
        async fn fetch_description(&self) -> Result<StatisticsDescription> {
            Ok(serde_json::from_value(json!({
                "groups": [{"group": "client", "name": "Client", "description": ""}],
                "figures": [{"group": "client", "identifier": "httpConnections",
                             "name": "Connections", "description": "Open connections.",
                             "type": "current"}]
            }))
            .unwrap())
        }

        async fn fetch_values(&self) -> Result<StatisticsDocument> {
            Ok(StatisticsDocument::from_value(json!({"client": {"httpConnections": 4}})).unwrap())
        }
    }

    fn internal_state() -> Arc<ExporterState> {
        let collector = Collector::new(
            Arc::new(StaticClient),
            Arc::new(MetricsRegistry::new(NAMESPACE)),
            Duration::from_secs(5),
        )
        .unwrap();
        Arc::new(ExporterState::internal(Arc::new(collector)))
    }

    async fn get(state: Arc<ExporterState>, uri: &str) -> (StatusCode, Option<String>, String) {
        let response = exporter_router(state)
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|value| value.to_str().unwrap().to_string());
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, content_type, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn landing_page_links_to_metrics() {
        let (status, content_type, body) = get(internal_state(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.unwrap().starts_with("text/html"));
        assert!(body.contains("<a href='/metrics'>Metrics</a>"));
    }

    #[tokio::test]
    async fn metrics_serves_translated_figures() {
        let (status, content_type, body) = get(internal_state(), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            content_type.as_deref(),
            Some("text/plain; version=0.0.4; charset=utf-8")
        );
        assert!(body.contains("\narangodb_client_connections 4\n"));
        assert!(body.contains("\narangodb_up 1\n"));
    }

    #[tokio::test]
    async fn passthru_failure_answers_500_with_error_text() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config =
            ExporterConfig::new(&format!("http://{addr}"), true, Duration::from_secs(2)).unwrap();
        let passthrough = PassthroughClient::new(config, Arc::new(NoAuthentication)).unwrap();
        let state = Arc::new(ExporterState::passthru(Arc::new(passthrough)));

        let (status, _, body) = get(state, "/metrics").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("_admin/metrics"));
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let (status, _, _) = get(internal_state(), "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
