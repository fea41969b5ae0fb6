//! iqkit Core - IQ sample storage and spectral processing
//!
//! This crate provides the canonical IQ sample buffer, the FFT engine and
//! the spectrum/waterfall accumulators that feed the renderer.

pub mod buffer;
pub mod fft;
pub mod spectrum;
pub mod waterfall;
pub mod error;

pub use error::{CoreError, Result};

/// Re-export of the complex sample type used throughout iqkit
pub use rustfft::num_complex::Complex32;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        buffer::{IqSampleBuffer, SourceEncoding},
        fft::{power_spectrum, shift, window::WindowKind, FftPlan},
        spectrum::{compute_spectrum, DisplayScale, FrameParams, Spectrum, SpectrumAccumulator, ValueRange},
        waterfall::{compute_waterfall, Waterfall, WaterfallParams},
        error::{CoreError, Result},
        Complex32,
    };
}
