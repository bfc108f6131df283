use std::sync::Arc;

use dispatcher::Dispatcher;
use thumbnailer::{
    server::{self, Services},
    thumbnail_slot::ThumbnailSlot,
    transform::ThumbnailTransform,
    types::{Environment, ServiceConfig},
};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let environment = Environment::from_env();

    // JSON logs for staging/production, regular format for development
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(environment.tracing_level()).into())
        .from_env_lossy();
    if environment.json_logs() {
        fmt().json().with_env_filter(filter).init();
    } else {
        fmt().with_env_filter(filter).init();
    }

    info!("Starting Thumbnailer in {:?} environment", environment);

    let config = Arc::new(ServiceConfig::from_environment(&environment)?);
    info!(
        max_long_side = config.transform.max_long_side.get(),
        temp_dir = %config.transform.temp_dir.display(),
        "✅ Loaded configuration"
    );

    let dispatcher = Dispatcher::start(config.dispatcher.clone());
    let thumbnails = ThumbnailTransform::new(config.transform.clone()).register(&dispatcher)?;
    info!("✅ Registered thumbnail topic");

    // Single shutdown token for everything
    let shutdown_token = CancellationToken::new();
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        server::shutdown_signal().await;
        info!("Shutting down Thumbnailer...");
        signal_token.cancel();
    });

    let services = Services {
        config,
        thumbnails,
        slot: Arc::new(ThumbnailSlot::new()),
        stats: dispatcher.stats_handle(),
    };

    // Start HTTP server (blocks until shutdown)
    let server_result = server::start(services, shutdown_token).await;

    dispatcher.shutdown().await;
    info!("✅ Thumbnailer shutdown complete");

    server_result
}
