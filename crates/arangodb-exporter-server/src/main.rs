use std::{path::PathBuf, sync::Arc, time::Duration};

use arangodb_exporter_auth::token_provider;
use arangodb_exporter_http::{ExporterState, exporter_router};
use arangodb_exporter_metrics::MetricsRegistry;
use arangodb_exporter_stats::{
    BuildInfo, Collector, ExporterConfig, HttpStatisticsClient, NAMESPACE, PassthroughClient,
};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Translate /_admin/statistics into Prometheus metrics.
    Internal,
    /// Forward /_admin/metrics unchanged.
    Passthru,
}

#[derive(Debug, Parser)]
#[command(name = "arangodb-exporter", about = "Prometheus exporter for ArangoDB statistics")]
struct Cli {
    /// Address the exporter will listen on (IP:port)
    #[arg(long = "server.address", env = "EXPORTER_ADDRESS", default_value = "0.0.0.0:9101")]
    address: String,

    #[arg(long = "arangodb.endpoint", env = "DB_URL", default_value = "http://127.0.0.1:8529")]
    endpoint: String,

    /// JWT secret used for authentication with the ArangoDB server
    #[arg(long = "arangodb.jwtsecret", env = "ARANGODB_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// File containing the JWT for authentication with the ArangoDB server
    #[arg(long = "arangodb.jwt-file", env = "ARANGODB_JWT_FILE")]
    jwt_file: Option<PathBuf>,

    /// Timeout of statistics requests, e.g. `15s` or `500ms`
    #[arg(long = "arangodb.timeout", default_value = "15s", value_parser = parse_duration)]
    timeout: Duration,

    /// Verify the ArangoDB server's TLS certificate
    #[arg(long = "arangodb.ssl-verify", default_value_t = false)]
    ssl_verify: bool,

    #[arg(long, value_enum, default_value_t = Mode::Internal)]
    mode: Mode,
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|err| err.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::from_default_env().add_directive("arangodb_exporter=info".parse()?);
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let build_info = BuildInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        revision: option_env!("ARANGODB_EXPORTER_REVISION")
            .unwrap_or("dev")
            .to_string(),
    };
    info!(
        version = %build_info.version,
        revision = %build_info.revision,
        "starting arangodb-exporter"
    );

    if cli.jwt_secret.is_some() && cli.jwt_file.is_some() {
        warn!("both --arangodb.jwtsecret and --arangodb.jwt-file set, using the JWT file");
    }
    if !cli.ssl_verify && cli.endpoint.starts_with("https") {
        warn!("TLS certificate verification of the ArangoDB server is disabled");
    }

    let config = ExporterConfig::new(&cli.endpoint, cli.ssl_verify, cli.timeout)?;
    let tokens = token_provider(cli.jwt_file, cli.jwt_secret);

    let state = match cli.mode {
        Mode::Internal => {
            let client = Arc::new(HttpStatisticsClient::new(config.clone(), tokens)?);
            let registry = Arc::new(MetricsRegistry::new(NAMESPACE));
            let collector = Collector::new(client, registry, config.timeout)?;
            collector.register_build_info(&build_info)?;
            ExporterState::internal(Arc::new(collector))
        }
        Mode::Passthru => {
            ExporterState::passthru(Arc::new(PassthroughClient::new(config.clone(), tokens)?))
        }
    };
    info!(endpoint = %config.endpoint(), mode = ?cli.mode, "monitoring ArangoDB");

    let app = exporter_router(Arc::new(state));
    let listener = tokio::net::TcpListener::bind(&cli.address).await?;
    info!("arangodb-exporter listening on {}", cli.address);
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use clap::Parser;

    use super::{Cli, Mode};

    #[test]
    fn defaults_match_documented_flags() {
        let cli = Cli::try_parse_from(["arangodb-exporter"]).unwrap();
        assert_eq!(cli.address, "0.0.0.0:9101");
        assert_eq!(cli.timeout, Duration::from_secs(15));
        assert_eq!(cli.mode, Mode::Internal);
        assert!(!cli.ssl_verify);
    }

    #[test]
    fn parses_dotted_flags() {
        let cli = Cli::try_parse_from([
            "arangodb-exporter",
            "--server.address",
            "127.0.0.1:9200",
            "--arangodb.endpoint",
            "https://db:8529",
            "--arangodb.jwt-file",
            "/secrets/jwt",
            "--arangodb.timeout",
            "500ms",
            "--arangodb.ssl-verify",
            "--mode",
            "passthru",
        ])
        .unwrap();

        assert_eq!(cli.address, "127.0.0.1:9200");
        assert_eq!(cli.endpoint, "https://db:8529");
        assert_eq!(cli.jwt_file.as_deref(), Some(std::path::Path::new("/secrets/jwt")));
        assert_eq!(cli.timeout, Duration::from_millis(500));
        assert!(cli.ssl_verify);
        assert_eq!(cli.mode, Mode::Passthru);
    }

    #[test]
    fn rejects_bad_timeout() {
        assert!(Cli::try_parse_from(["arangodb-exporter", "--arangodb.timeout", "soon"]).is_err());
    }
}
