use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{debug, error};

use crate::report::{ReportRequest, ValidationError};
use crate::{RenderedReport, ReportError, generate_report};

use super::models::ErrorResponse;
use super::state::ServerState;

#[derive(Debug)]
pub(crate) struct ServerError {
    pub(crate) status: StatusCode,
    pub(crate) body: ErrorResponse,
}

impl ServerError {
    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse {
                error: message.into(),
                details: None,
                kind: None,
            },
        }
    }

    pub(crate) fn internal(details: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorResponse {
                error: "Erro ao gerar PDF".to_string(),
                details: Some(details.into()),
                kind: Some(kind.into()),
            },
        }
    }
}

impl From<ReportError> for ServerError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::Validation(err) => ServerError::bad_request(err.to_string()),
            other => ServerError::internal(other.to_string(), other.kind()),
        }
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::internal(err.to_string(), "InternalError")
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Parses and renders one request body. Runs on the blocking pool.
pub(crate) fn generate_request(
    state: &ServerState,
    body: &[u8],
) -> Result<RenderedReport, ServerError> {
    let request = ReportRequest::from_json(body).map_err(|err| {
        // Malformed bodies are reported as missing data.
        debug!("rejecting request body: {}", err);
        ServerError::bad_request(ValidationError::MissingData.to_string())
    })?;
    generate_report(&request, &state.settings, &state.fonts).map_err(|err| {
        if !matches!(err, ReportError::Validation(_)) {
            error!("failed to generate pdf: {}", err);
        }
        ServerError::from(err)
    })
}
