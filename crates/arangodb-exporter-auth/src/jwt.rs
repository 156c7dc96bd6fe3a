use arangodb_exporter_common::error::{ExporterError, Result};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const JWT_ISSUER: &str = "arangodb";
pub const JWT_SERVER_ID: &str = "arangodb-exporter";

/// Mints a superuser JWT signed with the server's shared secret.
pub fn create_arangod_jwt(secret: &str) -> Result<String> {
    create_arangod_jwt_at(secret, Utc::now().timestamp())
}

pub fn create_arangod_jwt_at(secret: &str, issued_at: i64) -> Result<String> {
    if secret.is_empty() {
        return Err(ExporterError::Authentication(
            "JWT secret must not be empty".to_string(),
        ));
    }

    let header = json!({ "alg": "HS256", "typ": "JWT" });
    let claims = json!({
        "iss": JWT_ISSUER,
        "server_id": JWT_SERVER_ID,
        "iat": issued_at,
    });

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header.to_string()),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    );
    let signature = hmac_sha256(secret.as_bytes(), signing_input.as_bytes())?;

    Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
}

/// Value of the `Authorization` header ArangoDB expects for a JWT.
pub fn authorization_header(token: &str) -> String {
    format!("bearer {token}")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|err| ExporterError::Authentication(format!("invalid JWT secret: {err}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
