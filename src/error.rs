use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by loading, rendering and exporting watermarked images.
#[derive(Debug, Error)]
pub enum WatermarkError {
    #[error("could not open image '{}': {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("could not save image '{}': {source}", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("font error: {0}")]
    Font(String),

    #[error("image has no pixels")]
    EmptyImage,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WatermarkError>;
