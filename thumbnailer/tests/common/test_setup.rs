use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request},
    response::Response,
    Router,
};
use dispatcher::{Dispatcher, DispatcherConfig};
use tempfile::TempDir;
use thumbnailer::{
    server::{self, Services},
    thumbnail_slot::ThumbnailSlot,
    transform::{ThumbnailTopic, ThumbnailTransform, TransformConfig},
    types::ServiceConfig,
};
use tower::ServiceExt;

/// Initialize tracing for tests
pub fn setup_test_env() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init()
        .ok();
}

/// Service configuration pointed at `temp_dir`
pub fn test_config(temp_dir: &TempDir) -> ServiceConfig {
    ServiceConfig {
        port: 0,
        transform: TransformConfig {
            max_long_side: NonZeroU32::new(250).unwrap(),
            jpeg_quality: 85,
            temp_dir: temp_dir.path().to_path_buf(),
        },
        dispatcher: DispatcherConfig::new(2).with_queue_capacity(32),
        dispatch_timeout: Duration::from_secs(10),
        max_upload_bytes: 15_728_640,
    }
}

/// A running thumbnailer router backed by its own temp dir and dispatcher
pub struct TestContext {
    pub router: Router,
    pub slot: Arc<ThumbnailSlot>,
    pub dispatcher: Dispatcher,
    // Keep the temp dir alive for the duration of the test
    pub temp_dir: TempDir,
}

impl TestContext {
    /// Context with the real thumbnail transform
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Context with the real thumbnail transform and an adjusted configuration
    pub fn with_config(adjust: impl FnOnce(&mut ServiceConfig)) -> Self {
        Self::build(adjust, |config, dispatcher| {
            ThumbnailTransform::new(config.transform.clone())
                .register(dispatcher)
                .unwrap()
        })
    }

    /// Context whose thumbnail topic is served by `register`
    pub fn build(
        adjust: impl FnOnce(&mut ServiceConfig),
        register: impl FnOnce(&ServiceConfig, &Dispatcher) -> ThumbnailTopic,
    ) -> Self {
        setup_test_env();

        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir);
        adjust(&mut config);

        let dispatcher = Dispatcher::start(config.dispatcher.clone());
        let thumbnails = register(&config, &dispatcher);
        let slot = Arc::new(ThumbnailSlot::new());

        let router = server::router(Services {
            config: Arc::new(config),
            thumbnails,
            slot: slot.clone(),
            stats: dispatcher.stats_handle(),
        });

        Self {
            router,
            slot,
            dispatcher,
            temp_dir,
        }
    }

    pub async fn send_request(&self, method: Method, route: &str, body: Vec<u8>) -> Response {
        let request = Request::builder()
            .uri(route)
            .method(method)
            .body(Body::from(body))
            .unwrap();

        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn upload(&self, image: Vec<u8>) -> Response {
        self.send_request(Method::POST, "/thumbnail", image).await
    }

    pub async fn fetch_thumbnail(&self) -> Response {
        self.send_request(Method::GET, "/image/thumbnail.jpg", Vec::new())
            .await
    }

    /// Number of files left in the service's temp dir
    pub fn temp_files(&self) -> usize {
        std::fs::read_dir(self.temp_dir.path()).unwrap().count()
    }
}
