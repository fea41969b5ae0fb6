//! Error types for iqkit rendering

use std::path::PathBuf;
use thiserror::Error;

/// Rendering error types
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Invalid image dimensions {width}x{height}: {msg}")]
    InvalidDimensions { width: usize, height: usize, msg: String },
    
    #[error("PNG encoding failed for {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: ::image::ImageError,
    },
    
    #[error("Core error: {0}")]
    Core(#[from] iqkit_core::CoreError),
}

/// Result type for iqkit rendering operations
pub type Result<T> = std::result::Result<T, RenderError>;
