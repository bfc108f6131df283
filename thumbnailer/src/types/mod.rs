mod config;
mod environment;
pub mod error;

pub use config::{ConfigError, ServiceConfig};
pub use environment::Environment;
pub use error::AppError;
