//! Environment configuration for different deployment stages

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::Level;

/// Application environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Production environment
    Production,
    /// Staging environment
    Staging,
    /// Development environment
    Development,
}

impl Environment {
    /// Creates an Environment from the `APP_ENV` environment variable
    ///
    /// # Panics
    ///
    /// Panics if `APP_ENV` contains an invalid value
    #[must_use]
    pub fn from_env() -> Self {
        let env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .trim()
            .to_lowercase();

        match env.as_str() {
            "production" => Self::Production,
            "staging" => Self::Staging,
            "development" => Self::Development,
            _ => panic!("Invalid environment: {env}"),
        }
    }

    /// Whether logs should be emitted as JSON
    #[must_use]
    pub const fn json_logs(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }

    /// Returns the port the HTTP server listens on
    #[must_use]
    pub fn port(&self) -> u16 {
        parse_var("PORT").unwrap_or(8080)
    }

    /// Returns the maximum long side of a thumbnail in pixels
    #[must_use]
    pub fn max_long_side(&self) -> u32 {
        parse_var("THUMBNAIL_MAX_LONG_SIDE").unwrap_or(250)
    }

    /// Returns the JPEG quality used for thumbnails
    #[must_use]
    pub fn jpeg_quality(&self) -> u8 {
        parse_var("THUMBNAIL_JPEG_QUALITY").unwrap_or(85)
    }

    /// Returns the directory holding uploads and thumbnails
    #[must_use]
    pub fn temp_dir(&self) -> PathBuf {
        env::var("THUMBNAIL_TEMP_DIR").map_or_else(|_| env::temp_dir(), PathBuf::from)
    }

    /// Returns the default number of dispatch workers for this environment
    #[must_use]
    pub const fn default_num_workers(&self) -> usize {
        match self {
            Self::Production => 8,
            Self::Staging => 4,
            Self::Development => 2,
        }
    }

    /// Returns the number of dispatch workers with environment variable override support
    #[must_use]
    pub fn num_workers(&self) -> usize {
        parse_var("DISPATCHER_NUM_WORKERS").unwrap_or_else(|| self.default_num_workers())
    }

    /// Returns how long an upload waits for its thumbnail before failing
    #[must_use]
    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(parse_var("DISPATCH_TIMEOUT_SECS").unwrap_or(30))
    }

    /// Returns the maximum accepted upload size in bytes (default 15 MiB)
    #[must_use]
    pub fn max_upload_bytes(&self) -> usize {
        parse_var("MAX_UPLOAD_BYTES").unwrap_or(15_728_640)
    }

    /// Returns the default log level, overridable with `TRACING_LEVEL`
    #[must_use]
    pub fn tracing_level(&self) -> Level {
        env::var("TRACING_LEVEL")
            .ok()
            .and_then(|val| val.parse::<Level>().ok())
            .unwrap_or(match self {
                Self::Production | Self::Staging => Level::INFO,
                Self::Development => Level::DEBUG,
            })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
