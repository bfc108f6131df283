use std::sync::Arc;

use axum::{Extension, Json};
use dispatcher::{DispatcherStats, StatsHandle};
use serde::Serialize;

use crate::thumbnail_slot::ThumbnailSlot;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: String,
    /// Current version of the application
    semver: String,
    /// Commit hash of the current build (if available)
    rev: Option<String>,
    /// Whether an upload has produced a thumbnail yet
    has_thumbnail: bool,
    /// Dispatcher counters
    dispatcher: DispatcherStats,
}

/// Health check endpoint
///
/// Returns the current status and version information of the service along with
/// the dispatcher counters.
pub async fn handler(
    Extension(slot): Extension<Arc<ThumbnailSlot>>,
    Extension(stats): Extension<StatsHandle>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        semver: env!("CARGO_PKG_VERSION").to_string(),
        rev: option_env!("GIT_REV").map(ToString::to_string),
        has_thumbnail: !slot.is_empty(),
        dispatcher: stats.snapshot(),
    })
}
