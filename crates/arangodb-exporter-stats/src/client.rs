use std::sync::Arc;

use arangodb_exporter_auth::{TokenProvider, jwt::authorization_header};
use arangodb_exporter_common::error::{ExporterError, Result};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use url::Url;

use crate::{
    config::ExporterConfig, description::StatisticsDescription, document::StatisticsDocument,
};

pub const STATISTICS_DESCRIPTION_PATH: &str = "_admin/statistics-description";
pub const STATISTICS_PATH: &str = "_admin/statistics";

/// Source of the two documents a scrape needs. Each call is a single attempt.
#[async_trait]
pub trait StatisticsClient: Send + Sync {
    async fn fetch_description(&self) -> Result<StatisticsDescription>;
    async fn fetch_values(&self) -> Result<StatisticsDocument>;
}

pub struct HttpStatisticsClient {
    client: reqwest::Client,
    config: ExporterConfig,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpStatisticsClient {
    pub fn new(config: ExporterConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        Ok(Self {
            client: config.build_http_client()?,
            config,
            tokens,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.config.url_for(path)?;
        let response = authorized_get(&self.client, &self.config, &url, self.tokens.as_ref()).await?;

        if !response.status().is_success() {
            return Err(ExporterError::UnexpectedStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| transport_error(&self.config, &url, err))?;
        serde_json::from_slice(&body).map_err(|err| ExporterError::Decode {
            url: url.to_string(),
            message: err.to_string(),
        })
    }
}

#[async_trait]
impl StatisticsClient for HttpStatisticsClient {
    async fn fetch_description(&self) -> Result<StatisticsDescription> {
        self.get_json(STATISTICS_DESCRIPTION_PATH).await
    }

    async fn fetch_values(&self) -> Result<StatisticsDocument> {
        self.get_json(STATISTICS_PATH).await
    }
}

/// Issues a GET with the provider's token attached, if there is one.
pub(crate) async fn authorized_get(
    client: &reqwest::Client,
    config: &ExporterConfig,
    url: &Url,
    tokens: &dyn TokenProvider,
) -> Result<reqwest::Response> {
    let token = tokens.provide_token()?;
    let mut request = client.get(url.clone());
    if !token.is_empty() {
        request = request.header(AUTHORIZATION, authorization_header(&token));
    }

    request
        .send()
        .await
        .map_err(|err| transport_error(config, url, err))
}

fn transport_error(config: &ExporterConfig, url: &Url, err: reqwest::Error) -> ExporterError {
    if err.is_timeout() {
        ExporterError::Timeout(config.timeout)
    } else {
        ExporterError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use arangodb_exporter_auth::{NoAuthentication, TokenProvider};
    use arangodb_exporter_common::error::Result;
    use axum::{
        Json, Router,
        http::{HeaderMap, StatusCode, header},
        routing::get,
    };
    use serde_json::json;

    use super::{HttpStatisticsClient, StatisticsClient};
    use crate::{config::ExporterConfig, description::FigureType, test_support::spawn_server};

    struct FixedToken(&'static str);

    impl TokenProvider for FixedToken {
        fn provide_token(&self) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn client(endpoint: &str, tokens: Arc<dyn TokenProvider>) -> HttpStatisticsClient {
        let config = ExporterConfig::new(endpoint, true, Duration::from_secs(5)).unwrap();
        HttpStatisticsClient::new(config, tokens).unwrap()
    }

    #[tokio::test]
    async fn fetches_description_and_values() {
        let router = Router::new()
            .route(
                "/_admin/statistics-description",
                get(|| async {
                    Json(json!({
                        "groups": [{"group": "system", "name": "System", "description": ""}],
                        "figures": [{"group": "system", "identifier": "uptime", "name": "Uptime",
                                     "description": "", "type": "accumulated", "unit": "s"}],
                        "error": false,
                        "code": 200
                    }))
                }),
            )
            .route(
                "/_admin/statistics",
                get(|| async { Json(json!({"system": {"uptime": 123}, "error": false})) }),
            );
        let endpoint = spawn_server(router).await;
        let client = client(&endpoint, Arc::new(NoAuthentication));

        let description = client.fetch_description().await.unwrap();
        assert_eq!(description.figures[0].figure_type, FigureType::Accumulated);

        let values = client.fetch_values().await.unwrap();
        assert_eq!(values.get_group("system").unwrap().get_float("uptime"), Some(123.0));
    }

    #[tokio::test]
    async fn sends_bearer_token() {
        let router = Router::new().route(
            "/_admin/statistics",
            get(|headers: HeaderMap| async move {
                match headers.get(header::AUTHORIZATION) {
                    Some(value) if value == "bearer abc.def.ghi" => {
                        (StatusCode::OK, Json(json!({"ok": {}})))
                    }
                    _ => (StatusCode::UNAUTHORIZED, Json(json!({"error": true}))),
                }
            }),
        );
        let endpoint = spawn_server(router).await;

        let authorized = client(&endpoint, Arc::new(FixedToken("abc.def.ghi")));
        assert!(authorized.fetch_values().await.is_ok());

        let anonymous = client(&endpoint, Arc::new(NoAuthentication));
        let err = anonymous.fetch_values().await.unwrap_err();
        assert_eq!(err.kind(), "unexpected_status");
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let router = Router::new().route(
            "/_admin/statistics-description",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "starting up") }),
        );
        let endpoint = spawn_server(router).await;

        let err = client(&endpoint, Arc::new(NoAuthentication))
            .fetch_description()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "unexpected_status");
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let router = Router::new()
            .route("/_admin/statistics", get(|| async { "not json" }))
            .route(
                "/_admin/statistics-description",
                get(|| async { Json(json!({"figures": [{"group": "g"}]})) }),
            );
        let endpoint = spawn_server(router).await;
        let client = client(&endpoint, Arc::new(NoAuthentication));

        assert_eq!(client.fetch_values().await.unwrap_err().kind(), "decode");
        assert_eq!(client.fetch_description().await.unwrap_err().kind(), "decode");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(&format!("http://{addr}"), Arc::new(NoAuthentication))
            .fetch_values()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "transport");
    }

    #[tokio::test]
    async fn token_failure_aborts_request() {
        struct Broken;
        impl TokenProvider for Broken {
            fn provide_token(&self) -> Result<String> {
                Err(arangodb_exporter_common::ExporterError::Authentication(
                    "no token".to_string(),
                ))
            }
        }

        let err = client("http://127.0.0.1:9", Arc::new(Broken))
            .fetch_values()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "authentication");
    }
}
