use std::time::Duration;

use arangodb_exporter_common::error::{ExporterError, Result};
use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Connection settings for the monitored ArangoDB server.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    endpoint: Url,
    pub tls_verify: bool,
    pub timeout: Duration,
}

impl ExporterConfig {
    pub fn new(endpoint: &str, tls_verify: bool, timeout: Duration) -> Result<Self> {
        let endpoint = endpoint.trim();
        if endpoint.is_empty() {
            return Err(ExporterError::InvalidConfig(
                "ArangoDB endpoint must not be empty".to_string(),
            ));
        }

        let mut endpoint = Url::parse(endpoint).map_err(|err| {
            ExporterError::InvalidConfig(format!("invalid ArangoDB endpoint {endpoint}: {err}"))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ExporterError::InvalidConfig(format!(
                "unsupported endpoint scheme {}, expected http or https",
                endpoint.scheme()
            )));
        }
        if timeout.is_zero() {
            return Err(ExporterError::InvalidConfig(
                "request timeout must be greater than zero".to_string(),
            ));
        }

        // Relative joins must append to a database path such as /_db/name.
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }

        Ok(Self {
            endpoint,
            tls_verify,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn url_for(&self, path: &str) -> Result<Url> {
        self.endpoint
            .join(path.trim_start_matches('/'))
            .map_err(|err| ExporterError::InvalidArgument(format!("invalid request path {path}: {err}")))
    }

    pub fn build_http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .danger_accept_invalid_certs(!self.tls_verify)
            .build()
            .map_err(|err| ExporterError::InvalidConfig(format!("failed to build HTTP client: {err}")))
    }
}
