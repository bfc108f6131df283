mod current;
mod health;
mod thumbnail;

use axum::{
    routing::{any, get},
    Router,
};

/// Path that accepts image uploads
pub const THUMBNAIL_REQ_URI: &str = "/thumbnail";

/// Path serving the most recently generated thumbnail
pub const IMG_THUMBNAIL_URI: &str = "/image/thumbnail.jpg";

/// Creates the router with all handler routes
///
/// The upload and image routes accept every method so that unsupported ones get a
/// 400 naming the method instead of a bare 405.
pub fn handler() -> Router {
    Router::new()
        .route(THUMBNAIL_REQ_URI, any(thumbnail::handler))
        .route(IMG_THUMBNAIL_URI, any(current::handler))
        .route("/health", get(health::handler))
}
