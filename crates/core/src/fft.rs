//! FFT engine
//!
//! Thin wrapper around `rustfft` with the two reductions the display
//! pipeline needs: `shift` (DC to the center) and `power_spectrum`.

use crate::{CoreError, Result};
use rustfft::{num_complex::Complex32, Fft, FftDirection, FftPlanner};
use std::fmt;
use std::sync::Arc;

/// Reusable transform plan for one power-of-two length
pub struct FftPlan {
    size: usize,
    direction: FftDirection,
    fft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex32>,
}

impl fmt::Debug for FftPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftPlan")
            .field("size", &self.size)
            .field("direction", &self.direction)
            .finish()
    }
}

impl FftPlan {
    /// Plan a forward transform of `size` points
    pub fn forward(size: usize) -> Result<Self> {
        Self::new(size, FftDirection::Forward)
    }

    /// Plan a transform of `size` points in the given direction
    pub fn new(size: usize, direction: FftDirection) -> Result<Self> {
        if size == 0 || !size.is_power_of_two() {
            return Err(CoreError::InvalidFftSize { size });
        }

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft(size, direction);
        let scratch = vec![Complex32::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        Ok(Self {
            size,
            direction,
            fft,
            scratch,
        })
    }

    /// Transform length
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn direction(&self) -> FftDirection {
        self.direction
    }

    /// Transform `input` into a freshly allocated output vector
    ///
    /// The result is unnormalized, matching the textbook DFT sum.
    pub fn execute(&mut self, input: &[Complex32]) -> Result<Vec<Complex32>> {
        let mut output = input.to_vec();
        self.execute_in_place(&mut output)?;
        Ok(output)
    }

    /// Transform `buffer` in place
    pub fn execute_in_place(&mut self, buffer: &mut [Complex32]) -> Result<()> {
        if buffer.len() != self.size {
            return Err(CoreError::BufferSizeMismatch {
                expected: self.size,
                actual: buffer.len(),
            });
        }

        self.fft.process_with_scratch(buffer, &mut self.scratch);
        Ok(())
    }
}

/// Reorder bins so index 0 is the most negative frequency and DC sits at `len / 2`
pub fn shift<T: Copy>(spectrum: &[T]) -> Vec<T> {
    let mut shifted = spectrum.to_vec();
    shift_in_place(&mut shifted);
    shifted
}

/// In-place variant of [`shift`]
pub fn shift_in_place<T>(spectrum: &mut [T]) {
    let half = spectrum.len() / 2;
    spectrum.rotate_right(half);
}

/// Per-bin magnitude squared, optionally shifted first
///
/// No floor is applied here; log scaling adds its own epsilon.
pub fn power_spectrum(spectrum: &[Complex32], apply_shift: bool) -> Vec<f32> {
    let mut power: Vec<f32> = spectrum.iter().map(|c| c.norm_sqr()).collect();
    if apply_shift {
        shift_in_place(&mut power);
    }
    power
}

/// Frequency offset from center, in Hz, of a bin in a shifted spectrum
pub fn shifted_bin_offset_hz(bin: usize, size: usize, sample_rate: f64) -> f64 {
    (bin as f64 - (size / 2) as f64) * sample_rate / size as f64
}

/// Windowing functions applied before the transform
pub mod window {
    use serde::{Deserialize, Serialize};

    /// Supported window shapes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum WindowKind {
        /// No tapering
        #[default]
        Rectangular,
        Hann,
        Blackman,
    }

    impl WindowKind {
        /// Window coefficients for `n` points
        pub fn coefficients(&self, n: usize) -> Vec<f32> {
            if n < 2 {
                return vec![1.0; n];
            }

            let denom = (n - 1) as f32;
            (0..n)
                .map(|i| {
                    let phase = 2.0 * std::f32::consts::PI * i as f32 / denom;
                    match self {
                        WindowKind::Rectangular => 1.0,
                        WindowKind::Hann => 0.5 * (1.0 - phase.cos()),
                        WindowKind::Blackman => {
                            let a0 = 0.42;
                            let a1 = 0.5;
                            let a2 = 0.08;
                            a0 - a1 * phase.cos() + a2 * (2.0 * phase).cos()
                        }
                    }
                })
                .collect()
        }

        pub fn is_rectangular(&self) -> bool {
            matches!(self, WindowKind::Rectangular)
        }
    }
}
