use thiserror::Error;

/// Error types for the thumbnail transform
#[derive(Error, Debug)]
pub enum TransformError {
    /// Reading the source or writing the thumbnail failed
    #[error("Thumbnail I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The source is not a readable image
    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    /// The thumbnail could not be encoded
    #[error("Failed to encode thumbnail: {0}")]
    Encode(#[source] image::ImageError),

    /// The source image has no pixels
    #[error("Image has zero width or height")]
    EmptyImage,
}
