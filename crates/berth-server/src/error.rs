//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use berth_core::BerthError;
use thiserror::Error;
use tracing::{error, warn};

/// Error returned by HTTP handlers
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Berth(#[from] BerthError),

    #[error("{0}")]
    BadRequest(String),

    #[error("Payload store cannot serve blobs directly")]
    MethodNotAllowed,

    #[error("Content-Length header is required")]
    LengthRequired,
}

impl ApiError {
    /// Status code this error is reported with
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Berth(err) => status_of(err),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::LengthRequired => StatusCode::LENGTH_REQUIRED,
        }
    }
}

fn status_of(err: &BerthError) -> StatusCode {
    match err {
        BerthError::InvalidDigest { .. }
        | BerthError::UnsupportedHash { .. }
        | BerthError::InvalidDid { .. }
        | BerthError::Encoding { .. }
        | BerthError::PolicyViolation { .. }
        | BerthError::MissingProof { .. }
        | BerthError::InvalidSignature { .. }
        | BerthError::HandlerNotFound { .. } => StatusCode::BAD_REQUEST,
        BerthError::MissingAllocation { .. } | BerthError::AllocationExpired { .. } => {
            StatusCode::FORBIDDEN
        },
        BerthError::NotFound { .. } | BerthError::BlobNotFound { .. } => StatusCode::NOT_FOUND,
        BerthError::DataInconsistent { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = ?self, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request rejected");
        }
        (status, self.to_string()).into_response()
    }
}
