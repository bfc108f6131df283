//! Thumbnail transform
//!
//! Scales an image on disk so its long side is at most `max_long_side` pixels,
//! preserving the aspect ratio, and writes the result as a JPEG to a fresh temp file.

mod error;

use std::io::{BufWriter, Write};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dispatcher::{DispatchResult, Dispatcher, Topic};
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage, ImageReader};
use tempfile::TempPath;
use tracing::{debug, info};

use crate::upload::UploadedImage;

pub use error::TransformError;

/// Topic name the transform is registered under
pub const THUMBNAIL_TOPIC: &str = "thumbnail";

/// Handle used to dispatch uploads to the thumbnail transform
pub type ThumbnailTopic = Topic<UploadedImage, ThumbnailResult, TransformError>;

/// Configuration for thumbnail generation
#[derive(Debug, Clone)]
pub struct TransformConfig {
    /// Maximum long side in pixels
    pub max_long_side: NonZeroU32,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// Directory the thumbnail temp files are created in
    pub temp_dir: PathBuf,
}

/// A thumbnail on disk
///
/// The file is deleted when this value is dropped.
#[derive(Debug)]
pub struct ThumbnailResult {
    path: TempPath,
    width: u32,
    height: u32,
    len: u64,
}

impl ThumbnailResult {
    /// Returns the location of the JPEG file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the thumbnail width in pixels
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Returns the thumbnail height in pixels
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Returns the encoded size in bytes
    #[must_use]
    pub const fn encoded_len(&self) -> u64 {
        self.len
    }
}

/// Resizes images to thumbnails
#[derive(Debug, Clone)]
pub struct ThumbnailTransform {
    config: TransformConfig,
}

impl ThumbnailTransform {
    /// Create a new transform with the given configuration
    #[must_use]
    pub const fn new(config: TransformConfig) -> Self {
        Self { config }
    }

    /// Registers the transform as the handler of [`THUMBNAIL_TOPIC`]
    ///
    /// The uploaded file is deleted once the handler returns.
    ///
    /// # Errors
    ///
    /// Returns an error if the topic already has a handler
    pub fn register(self, dispatcher: &Dispatcher) -> DispatchResult<ThumbnailTopic, TransformError> {
        let transform = Arc::new(self);
        dispatcher.on(THUMBNAIL_TOPIC, move |upload: UploadedImage| {
            transform.apply(upload.path())
        })
    }

    /// Produces a thumbnail of the image at `source`
    ///
    /// Runs blocking I/O and CPU-bound work; call it from a worker, not an async task.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be decoded or the thumbnail cannot be
    /// written. No thumbnail file is left behind in that case.
    pub fn apply(&self, source: &Path) -> Result<ThumbnailResult, TransformError> {
        let image = ImageReader::open(source)?
            .with_guessed_format()?
            .decode()
            .map_err(TransformError::Decode)?;

        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(TransformError::EmptyImage);
        }

        let (thumb_width, thumb_height) = self.target_dimensions(width, height);
        debug!(
            width,
            height, thumb_width, thumb_height, "Scaling image to thumbnail"
        );

        let resized = if (thumb_width, thumb_height) == (width, height) {
            image
        } else {
            image.resize_exact(thumb_width, thumb_height, FilterType::Triangle)
        };
        let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());

        let mut file = tempfile::Builder::new()
            .prefix("thumbnail")
            .suffix(".jpg")
            .tempfile_in(&self.config.temp_dir)?;
        {
            let mut writer = BufWriter::new(file.as_file_mut());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(
                &mut writer,
                self.config.jpeg_quality,
            ))
            .map_err(TransformError::Encode)?;
            writer.flush()?;
        }
        let len = file.as_file().metadata()?.len();
        let path = file.into_temp_path();

        info!(
            path = %path.display(),
            width = thumb_width,
            height = thumb_height,
            "Image thumbnail now at: {}",
            path.display()
        );

        Ok(ThumbnailResult {
            path,
            width: thumb_width,
            height: thumb_height,
            len,
        })
    }

    /// Calculates thumbnail dimensions for a `width` x `height` image
    ///
    /// The long side becomes `min(max_long_side, long side)`; the short side is scaled
    /// by the same factor and truncated, but never below one pixel.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn target_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        let long_side = width.max(height);
        let target = self.config.max_long_side.get().min(long_side);
        let scale = f64::from(target) / f64::from(long_side);

        let scaled = |side: u32| {
            if side == long_side {
                target
            } else {
                ((f64::from(side) * scale) as u32).max(1)
            }
        };

        (scaled(width), scaled(height))
    }
}
