//! `GET` and `PUT /blob/:digest`.

use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::header::CONTENT_LENGTH;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use berth_core::{BerthError, Digest};
use berth_store::PayloadReader;
use futures::TryStreamExt;
use std::io;
use tokio_util::io::StreamReader;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{debug, info};

use super::request_context;
use crate::app::AppState;
use crate::error::ApiError;

/// Serve a stored blob from the payload store's files, honoring `Range`
pub async fn get_blob(
    State(state): State<AppState>,
    Path(digest): Path<String>,
    request: Request,
) -> Result<Response, ApiError> {
    let digest = Digest::from_multibase(&digest)?;
    let path = state
        .service
        .blobs()
        .file_path(&digest)
        .ok_or(ApiError::MethodNotAllowed)?;

    let response = match ServeFile::new(&path).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    if response.status() == StatusCode::NOT_FOUND {
        return Err(BerthError::NotFound {
            resource: format!("blob {}", digest),
        }
        .into());
    }

    debug!(blob = %digest, status = %response.status(), "serving blob");
    Ok(response.map(Body::new))
}

/// Accept upload bytes for an allocated digest
pub async fn put_blob(
    State(state): State<AppState>,
    Path(digest): Path<String>,
    headers: HeaderMap,
    body: Body,
) -> Result<StatusCode, ApiError> {
    let digest = Digest::from_multibase(&digest)?;
    let size = content_length(&headers)?;
    info!(blob = %digest, size, "upload started");

    let stream = body
        .into_data_stream()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
    let reader: PayloadReader = Box::pin(StreamReader::new(stream));

    let (ctx, _guard) = request_context();
    state.service.receive(&ctx, &digest, size, reader).await?;
    Ok(StatusCode::OK)
}

fn content_length(headers: &HeaderMap) -> Result<u64, ApiError> {
    let value = headers.get(CONTENT_LENGTH).ok_or(ApiError::LengthRequired)?;
    value
        .to_str()
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid Content-Length: {:?}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_content_length_parsing() {
        let mut headers = HeaderMap::new();
        assert!(matches!(content_length(&headers), Err(ApiError::LengthRequired)));

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("12345"));
        assert_eq!(content_length(&headers).unwrap(), 12345);

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("-1"));
        assert!(matches!(content_length(&headers), Err(ApiError::BadRequest(_))));
    }
}
