use std::sync::Arc;

use arangodb_exporter_auth::TokenProvider;
use arangodb_exporter_common::error::{ExporterError, Result};
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::{client::authorized_get, config::ExporterConfig};

pub const METRICS_PATH: &str = "_admin/metrics";

#[derive(Debug, Clone)]
pub struct PassthroughResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Forwards the server's native metrics endpoint without translation.
pub struct PassthroughClient {
    client: reqwest::Client,
    config: ExporterConfig,
    url: Url,
    tokens: Arc<dyn TokenProvider>,
}

impl PassthroughClient {
    pub fn new(config: ExporterConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        Ok(Self {
            client: config.build_http_client()?,
            url: config.url_for(METRICS_PATH)?,
            config,
            tokens,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub async fn fetch(&self) -> Result<PassthroughResponse> {
        let response =
            authorized_get(&self.client, &self.config, &self.url, self.tokens.as_ref()).await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(|err| ExporterError::Transport {
            url: self.url.to_string(),
            message: format!("unable to read body: {err}"),
        })?;

        Ok(PassthroughResponse {
            status,
            content_type,
            body,
        })
    }
}
