use std::sync::Arc;

use arangodb_exporter_stats::{Collector, PassthroughClient};
use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use tracing::warn;

use crate::{
    handlers::ExporterApiError,
    router::{ExportMode, ExporterState},
};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub async fn prometheus_metrics(
    State(state): State<Arc<ExporterState>>,
) -> Result<Response, ExporterApiError> {
    match &state.mode {
        ExportMode::Internal(collector) => Ok(translated_metrics(collector).await),
        ExportMode::Passthru(passthrough) => forward_metrics(passthrough).await,
    }
}

async fn translated_metrics(collector: &Collector) -> Response {
    let payload = collector.collect().await;

    let mut response = Response::new(Body::from(payload));
    *response.status_mut() = StatusCode::OK;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(PROMETHEUS_CONTENT_TYPE),
    );

    response
}

async fn forward_metrics(passthrough: &PassthroughClient) -> Result<Response, ExporterApiError> {
    let upstream = passthrough.fetch().await.inspect_err(|err| {
        warn!(url = %passthrough.url(), error = %err, "failed to forward native metrics");
    })?;

    let mut response = Response::new(Body::from(upstream.body));
    *response.status_mut() =
        StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
    if let Some(content_type) = upstream
        .content_type
        .and_then(|value| HeaderValue::from_str(&value).ok())
    {
        response.headers_mut().insert(header::CONTENT_TYPE, content_type);
    }

    Ok(response)
}
