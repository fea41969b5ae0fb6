//! Error types for iqkit container formats

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Container decoding and conversion error types
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Decode error: {msg}")]
    Decode { msg: String },
    
    #[error("Unsupported conversion from {from} to {to}")]
    UnsupportedConversion { from: String, to: String },
    
    #[error("Unsupported format: {name}")]
    UnsupportedFormat { name: String },
    
    #[error("Sample rate unknown; supply one explicitly")]
    MissingSampleRate,
    
    #[error("I/O error on {}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    
    #[error("WAV writer error: {0}")]
    Wav(#[from] hound::Error),
    
    #[error("Core error: {0}")]
    Core(#[from] iqkit_core::CoreError),
}

impl FormatError {
    pub(crate) fn decode(msg: impl Into<String>) -> Self {
        FormatError::Decode { msg: msg.into() }
    }
    
    /// Wrap an I/O error with the path it occurred on
    pub(crate) fn file(path: &Path) -> impl FnOnce(std::io::Error) -> FormatError {
        let path = path.to_path_buf();
        move |source| FormatError::File { path, source }
    }
}

/// Result type for iqkit format operations
pub type Result<T> = std::result::Result<T, FormatError>;
