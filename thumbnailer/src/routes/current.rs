use std::sync::Arc;

use axum::{
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    Extension,
};
use tracing::{debug, instrument};

use crate::{thumbnail_slot::ThumbnailSlot, types::AppError};

/// Serves the most recently generated thumbnail
///
/// The thumbnail is read while this handler holds its `Arc`, so a concurrent upload
/// replacing it cannot delete the file mid-read.
#[instrument(skip_all, fields(method = %method))]
pub async fn handler(
    method: Method,
    Extension(slot): Extension<Arc<ThumbnailSlot>>,
) -> Result<Response, AppError> {
    if method != Method::GET {
        return Err(AppError::method_not_supported(&method));
    }

    let Some(thumbnail) = slot.current() else {
        return Err(AppError::not_found("No thumbnail has been generated yet"));
    };

    let bytes = tokio::fs::read(thumbnail.path()).await?;
    debug!(
        path = %thumbnail.path().display(),
        len = thumbnail.encoded_len(),
        "Serving thumbnail"
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/jpeg".to_string()),
            (header::CONTENT_LENGTH, bytes.len().to_string()),
        ],
        bytes,
    )
        .into_response())
}
