//! Asynchronous image thumbnailing service

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// HTTP routes
pub mod routes;

/// HTTP server setup
pub mod server;

/// The current thumbnail
pub mod thumbnail_slot;

/// Thumbnail transform
pub mod transform;

/// Configuration and error types
pub mod types;

/// Uploaded images staged on disk
pub mod upload;
