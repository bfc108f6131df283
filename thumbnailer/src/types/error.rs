//! Universal error handling for the HTTP surface

use std::any::Any;

use axum::{
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
};
use dispatcher::DispatchError;

use crate::transform::TransformError;

/// Application error type, rendered as a short plain-text response
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    /// Create a new application error
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// The request used a method the path does not accept
    #[must_use]
    pub fn method_not_supported(method: &Method) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            format!("{method} not supported for this URI"),
        )
    }

    /// Nothing exists at the requested path yet
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Something failed while producing the response
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Returns the HTTP status of the error
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the message sent to the client
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error based on status code
        match self.status.as_u16() {
            400..=499 => tracing::warn!("Client error: {} - {}", self.status, self.message),
            500..=599 => tracing::error!("Server error: {} - {}", self.status, self.message),
            _ => {}
        }

        (
            self.status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.message,
        )
            .into_response()
    }
}

/// Convert dispatcher failures to application errors
///
/// Every failure of a dispatched thumbnail job is a server error carrying the
/// underlying message.
impl From<DispatchError<TransformError>> for AppError {
    fn from(err: DispatchError<TransformError>) -> Self {
        match &err {
            DispatchError::Handler(transform_err) => {
                tracing::warn!("Thumbnail transform failed: {transform_err}");
            }
            DispatchError::QueueFull { topic } => {
                tracing::warn!("Dispatch queue full for topic {topic}");
            }
            DispatchError::TimedOut { topic, after } => {
                tracing::error!("Topic {topic} timed out after {after:?}");
            }
            DispatchError::DuplicateTopic(_)
            | DispatchError::Closed { .. }
            | DispatchError::WorkerLost { .. } => {
                tracing::error!("Dispatcher error: {err}");
            }
        }

        Self::internal(err.to_string())
    }
}

/// Convert I/O errors while staging uploads or reading thumbnails
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        tracing::error!("I/O error: {err}");
        Self::internal(format!("I/O error: {err}"))
    }
}

/// Builds the response for a panic caught while handling a request
#[must_use]
#[allow(clippy::needless_pass_by_value)]
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = panic
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "Unknown panic while handling request".to_string());

    AppError::internal(message).into_response()
}
