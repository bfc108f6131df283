use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

use dispatcher::DispatcherConfig;
use thiserror::Error;

use crate::transform::TransformConfig;
use crate::types::Environment;

/// Errors raised while validating service configuration
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The maximum long side must be at least one pixel
    #[error("THUMBNAIL_MAX_LONG_SIDE must be greater than zero")]
    ZeroMaxLongSide,

    /// JPEG quality outside of `1..=100`
    #[error("THUMBNAIL_JPEG_QUALITY must be between 1 and 100, got {0}")]
    InvalidJpegQuality(u8),

    /// The temp directory does not exist or is not a directory
    #[error("THUMBNAIL_TEMP_DIR {0:?} is not a directory")]
    InvalidTempDir(PathBuf),
}

/// Configuration for the thumbnail service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Port the HTTP server listens on
    pub port: u16,
    /// Thumbnail transform settings
    pub transform: TransformConfig,
    /// Worker pool settings
    pub dispatcher: DispatcherConfig,
    /// How long an upload waits for its thumbnail
    pub dispatch_timeout: Duration,
    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: usize,
}

impl ServiceConfig {
    /// Creates a new `ServiceConfig` from the given environment
    ///
    /// # Errors
    ///
    /// Returns an error if a configured value is out of range
    pub fn from_environment(env: &Environment) -> Result<Self, ConfigError> {
        let max_long_side =
            NonZeroU32::new(env.max_long_side()).ok_or(ConfigError::ZeroMaxLongSide)?;

        let jpeg_quality = env.jpeg_quality();
        if !(1..=100).contains(&jpeg_quality) {
            return Err(ConfigError::InvalidJpegQuality(jpeg_quality));
        }

        let temp_dir = env.temp_dir();
        if !temp_dir.is_dir() {
            return Err(ConfigError::InvalidTempDir(temp_dir));
        }

        Ok(Self {
            port: env.port(),
            transform: TransformConfig {
                max_long_side,
                jpeg_quality,
                temp_dir,
            },
            dispatcher: DispatcherConfig::new(env.num_workers()),
            dispatch_timeout: env.dispatch_timeout(),
            max_upload_bytes: env.max_upload_bytes(),
        })
    }

    /// Returns the outer request timeout, which leaves room for the dispatch timeout
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.dispatch_timeout.saturating_add(Duration::from_secs(5))
    }
}
