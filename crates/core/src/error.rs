//! Error types for iqkit core

use thiserror::Error;

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid FFT size {size}: must be a non-zero power of two")]
    InvalidFftSize { size: usize },
    
    #[error("Buffer size mismatch: expected {expected}, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },
    
    #[error("Insufficient samples: need {required}, have {available}")]
    InsufficientSamples { required: usize, available: usize },
    
    #[error("Frame {index} contains non-finite values")]
    CorruptFrame { index: usize },
    
    #[error("No usable frames: all {skipped} frame(s) were rejected")]
    NoUsableFrames { skipped: usize },
    
    #[error("Invalid parameters: {msg}")]
    InvalidParameters { msg: String },
    
    #[error("Allocation of {bytes} bytes failed for {what}")]
    AllocationFailure { what: &'static str, bytes: usize },
}

/// Result type for iqkit core operations
pub type Result<T> = std::result::Result<T, CoreError>;
