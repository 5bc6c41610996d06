//! Error types for render and export operations
//!
//! Resource failures abort only the operation that hit them; the document
//! is never modified by a failed render or export.

use std::path::PathBuf;

/// Result type alias for render operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Result type alias for export operations
pub type ExportResult<T> = Result<T, ExportError>;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A render target could not be allocated
    #[error("Failed to allocate a {width}x{height} render target")]
    Allocation { width: u32, height: u32 },

    /// The crop rectangle has no overlap with the raw image
    #[error("Crop rectangle does not overlap the image")]
    EmptyCrop,

    /// The custom background image could not be opened or decoded
    #[error("Failed to load background image {path}: {source}")]
    BackgroundImage {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Failed to encode PNG: {0}")]
    Png(#[from] png::EncodingError),

    #[error("Failed to encode image as {format}: {source}")]
    Encode {
        format: &'static str,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Raw bytes could not be decoded back into an image
    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),
}
