use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    Extension,
};
use tokio::sync::oneshot;
use tracing::{info, instrument, warn};

use super::IMG_THUMBNAIL_URI;
use crate::{
    thumbnail_slot::ThumbnailSlot,
    transform::ThumbnailTopic,
    types::{AppError, ServiceConfig},
    upload::UploadedImage,
};

/// Accepts an image upload and answers once its thumbnail is ready
///
/// The method is checked before the body is read. The upload is staged to a temp file
/// and dispatched to the thumbnail topic. The completion callback publishes the
/// thumbnail and hands the response back to this exchange; the handler only awaits, so
/// no I/O thread is held while the resize runs.
#[instrument(skip_all, fields(method = %method))]
pub async fn handler(
    method: Method,
    Extension(config): Extension<Arc<ServiceConfig>>,
    Extension(thumbnails): Extension<ThumbnailTopic>,
    Extension(slot): Extension<Arc<ThumbnailSlot>>,
    request: Request,
) -> Result<Response, AppError> {
    if method != Method::POST {
        return Err(AppError::method_not_supported(&method));
    }

    // Bounded by the router's body limit
    let body = Bytes::from_request(request, &())
        .await
        .map_err(|rejection| AppError::new(rejection.status(), rejection.body_text()))?;

    let bytes = body.len();
    let upload = UploadedImage::persist(body, &config.transform.temp_dir).await?;
    info!(
        path = %upload.path().display(),
        bytes,
        "Upload staged, dispatching thumbnail job"
    );

    // Single response slot for this exchange, fulfilled by the completion callback
    let (response_tx, response_rx) = oneshot::channel::<Result<Response, AppError>>();

    thumbnails.dispatch_and_await(upload, move |outcome| {
        let response = outcome.map_err(AppError::from).map(|thumbnail| {
            info!(
                width = thumbnail.width(),
                height = thumbnail.height(),
                "Publishing new thumbnail"
            );
            slot.replace(thumbnail);
            redirect()
        });

        if response_tx.send(response).is_err() {
            warn!("Upload exchange already answered, dropping its response");
        }
    });

    match tokio::time::timeout(config.dispatch_timeout, response_rx).await {
        Ok(Ok(response)) => response,
        Ok(Err(_)) => Err(AppError::internal(
            "Thumbnail job ended without producing a response",
        )),
        Err(_) => Err(AppError::internal(format!(
            "Thumbnail generation did not complete within {}s",
            config.dispatch_timeout.as_secs_f64()
        ))),
    }
}

/// 301 pointing the client at the current thumbnail
fn redirect() -> Response {
    (
        StatusCode::MOVED_PERMANENTLY,
        [
            (header::LOCATION, IMG_THUMBNAIL_URI),
            (header::CONTENT_LENGTH, "0"),
        ],
    )
        .into_response()
}
