use std::{
    path::PathBuf,
    sync::Arc,
};

use arangodb_exporter_common::error::{ExporterError, Result};
use tracing::debug;

use crate::jwt::create_arangod_jwt;

/// Supplies the bearer token sent to the monitored server. An empty token
/// means the request goes out unauthenticated.
pub trait TokenProvider: Send + Sync {
    fn provide_token(&self) -> Result<String>;
}

#[derive(Clone, Debug, Default)]
pub struct NoAuthentication;

impl TokenProvider for NoAuthentication {
    fn provide_token(&self) -> Result<String> {
        Ok(String::new())
    }
}

/// Reads a pre-minted JWT from disk on every call, so a rotated file is
/// picked up without restarting the exporter.
#[derive(Clone, Debug)]
pub struct JwtFileProvider {
    path: PathBuf,
}

impl JwtFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenProvider for JwtFileProvider {
    fn provide_token(&self) -> Result<String> {
        let data = std::fs::read_to_string(&self.path).map_err(|err| {
            ExporterError::Authentication(format!(
                "failed to read JWT file {}: {err}",
                self.path.display()
            ))
        })?;
        Ok(data.trim().to_string())
    }
}

/// Signs a fresh JWT with the server secret for each request.
#[derive(Clone)]
pub struct JwtSecretProvider {
    secret: String,
}

impl JwtSecretProvider {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for JwtSecretProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSecretProvider")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl TokenProvider for JwtSecretProvider {
    fn provide_token(&self) -> Result<String> {
        create_arangod_jwt(&self.secret)
    }
}

impl TokenProvider for Arc<dyn TokenProvider> {
    fn provide_token(&self) -> Result<String> {
        self.as_ref().provide_token()
    }
}

/// Picks the provider for the configured credentials. A JWT file wins over a
/// secret.
pub fn token_provider(
    jwt_file: Option<PathBuf>,
    jwt_secret: Option<String>,
) -> Arc<dyn TokenProvider> {
    let jwt_secret = jwt_secret.filter(|secret| !secret.is_empty());
    match (jwt_file, jwt_secret) {
        (Some(path), _) => {
            debug!(path = %path.display(), "using JWT file authentication");
            Arc::new(JwtFileProvider::new(path))
        }
        (None, Some(secret)) => {
            debug!("using JWT secret authentication");
            Arc::new(JwtSecretProvider::new(secret))
        }
        (None, None) => Arc::new(NoAuthentication),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{JwtFileProvider, NoAuthentication, TokenProvider, token_provider};

    #[test]
    fn no_authentication_yields_empty_token() {
        assert_eq!(NoAuthentication.provide_token().unwrap(), "");
        assert_eq!(token_provider(None, None).provide_token().unwrap(), "");
        assert_eq!(
            token_provider(None, Some(String::new())).provide_token().unwrap(),
            ""
        );
    }

    #[test]
    fn file_provider_trims_and_rereads() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  first.token.value  ").unwrap();

        let provider = JwtFileProvider::new(file.path());
        assert_eq!(provider.provide_token().unwrap(), "first.token.value");

        std::fs::write(file.path(), "second.token.value\n").unwrap();
        assert_eq!(provider.provide_token().unwrap(), "second.token.value");
    }

    #[test]
    fn missing_file_is_an_authentication_error() {
        let dir = tempfile::tempdir().unwrap();
        let provider = JwtFileProvider::new(dir.path().join("absent.jwt"));

        let err = provider.provide_token().unwrap_err();
        assert_eq!(err.kind(), "authentication");
    }

    #[test]
    fn file_takes_precedence_over_secret() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "from.file.jwt").unwrap();

        let provider = token_provider(
            Some(file.path().to_path_buf()),
            Some("secret".to_string()),
        );
        assert_eq!(provider.provide_token().unwrap(), "from.file.jwt");
    }

    #[test]
    fn secret_provider_mints_three_part_token() {
        let provider = token_provider(None, Some("secret".to_string()));
        let token = provider.provide_token().unwrap();
        assert_eq!(token.split('.').count(), 3);
    }
}
