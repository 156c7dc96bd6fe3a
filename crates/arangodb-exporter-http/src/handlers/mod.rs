pub mod landing;
pub mod metrics;

use arangodb_exporter_common::error::ExporterError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Plain-text error body, matching what scrapers show in their target page.
pub struct ExporterApiError(pub ExporterError);

impl From<ExporterError> for ExporterApiError {
    fn from(value: ExporterError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ExporterApiError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string()).into_response()
    }
}
