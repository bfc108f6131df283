//! The current thumbnail, shared by every connection

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::transform::ThumbnailResult;

/// Holds at most one thumbnail, replaced atomically on each successful upload
///
/// Readers see either nothing or a complete thumbnail. A reader keeps the file alive
/// for as long as it holds the returned `Arc`, even if a newer thumbnail replaces it.
#[derive(Debug, Default)]
pub struct ThumbnailSlot {
    current: ArcSwapOption<ThumbnailResult>,
}

impl ThumbnailSlot {
    /// Creates an empty slot
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current thumbnail, if any upload has succeeded
    #[must_use]
    pub fn current(&self) -> Option<Arc<ThumbnailResult>> {
        self.current.load_full()
    }

    /// Makes `thumbnail` the current one and returns the one it replaced
    pub fn replace(&self, thumbnail: ThumbnailResult) -> Option<Arc<ThumbnailResult>> {
        self.current.swap(Some(Arc::new(thumbnail)))
    }

    /// Whether no thumbnail has been stored yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current.load().is_none()
    }
}
