use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, Extension, Router};
use dispatcher::StatsHandle;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::routes;
use crate::thumbnail_slot::ThumbnailSlot;
use crate::transform::ThumbnailTopic;
use crate::types::{error::panic_response, ServiceConfig};

/// Dependencies the HTTP handlers are given
#[derive(Clone)]
pub struct Services {
    /// Service configuration
    pub config: Arc<ServiceConfig>,
    /// Handle for dispatching thumbnail jobs
    pub thumbnails: ThumbnailTopic,
    /// The current thumbnail
    pub slot: Arc<ThumbnailSlot>,
    /// Dispatcher counters for the health endpoint
    pub stats: StatsHandle,
}

/// Builds the application router with all layers applied
pub fn router(services: Services) -> Router {
    let request_timeout = services.config.request_timeout();
    let max_upload_bytes = services.config.max_upload_bytes;

    routes::handler()
        .layer(Extension(services.config))
        .layer(Extension(services.thumbnails))
        .layer(Extension(services.slot))
        .layer(Extension(services.stats))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        // Any panic while building a response becomes a plain-text 500
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
}

/// Starts the server with the given dependencies
///
/// # Errors
///
/// Returns an error if the server fails to start or bind to the port
pub async fn start(services: Services, shutdown_token: CancellationToken) -> anyhow::Result<()> {
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], services.config.port));
    let router = router(services);

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🔄 Thumbnailer started on http://{addr}");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_token.cancelled().await;
        })
        .await
        .map_err(anyhow::Error::from)
}

/// Completes when the process receives Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
