//! IQ sample storage
//!
//! Samples are kept as interleaved `f32` pairs (I, Q) normalized to
//! [-1.0, 1.0], exactly as the container decoders produce them.

use crate::{CoreError, Result};
use rustfft::num_complex::Complex32;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

/// Encoding of the on-disk samples a buffer was decoded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceEncoding {
    /// Signed 8-bit I and Q
    S8,
    /// Signed 16-bit little-endian I and Q
    S16,
}

impl SourceEncoding {
    /// Bytes used by one I or Q component
    pub fn bytes_per_component(&self) -> usize {
        match self {
            SourceEncoding::S8 => 1,
            SourceEncoding::S16 => 2,
        }
    }

    /// Bytes used by one complex sample
    pub fn bytes_per_sample(&self) -> usize {
        self.bytes_per_component() * 2
    }

    /// Divisor mapping the integer range onto [-1.0, 1.0]
    pub fn full_scale(&self) -> f32 {
        match self {
            SourceEncoding::S8 => 128.0,
            SourceEncoding::S16 => 32768.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SourceEncoding::S8 => "s8",
            SourceEncoding::S16 => "s16",
        }
    }
}

impl std::fmt::Display for SourceEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Allocate a vector of `len` copies of `value`, reporting failure instead of aborting
pub fn try_vec<T: Clone>(len: usize, value: T, what: &'static str) -> Result<Vec<T>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len).map_err(|_| CoreError::AllocationFailure {
        what,
        bytes: len.saturating_mul(std::mem::size_of::<T>()),
    })?;
    data.resize(len, value);
    Ok(data)
}

/// Decoded, canonical IQ capture
///
/// The sample rate is `None` when the container carried no rate and the
/// caller did not supply one. Nothing in iqkit substitutes a default.
#[derive(Debug, Clone, PartialEq)]
pub struct IqSampleBuffer {
    data: Vec<f32>,
    sample_rate: Option<NonZeroU32>,
    encoding: SourceEncoding,
}

impl IqSampleBuffer {
    /// Build a buffer from interleaved I,Q values
    pub fn from_interleaved(
        data: Vec<f32>,
        sample_rate: Option<NonZeroU32>,
        encoding: SourceEncoding,
    ) -> Result<Self> {
        if data.len() % 2 != 0 {
            return Err(CoreError::BufferSizeMismatch {
                expected: data.len() + 1,
                actual: data.len(),
            });
        }

        Ok(Self {
            data,
            sample_rate,
            encoding,
        })
    }

    /// Build a buffer from complex samples
    pub fn from_complex(
        samples: &[Complex32],
        sample_rate: Option<NonZeroU32>,
        encoding: SourceEncoding,
    ) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(samples.len() * 2)
            .map_err(|_| CoreError::AllocationFailure {
                what: "IQ sample buffer",
                bytes: samples.len() * 8,
            })?;
        for s in samples {
            data.push(s.re);
            data.push(s.im);
        }

        Ok(Self {
            data,
            sample_rate,
            encoding,
        })
    }

    /// Replace the sample rate, e.g. with one supplied on the command line
    pub fn with_sample_rate(mut self, sample_rate: Option<NonZeroU32>) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Number of complex samples
    pub fn len(&self) -> usize {
        self.data.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn sample_rate(&self) -> Option<NonZeroU32> {
        self.sample_rate
    }

    pub fn encoding(&self) -> SourceEncoding {
        self.encoding
    }

    /// Interleaved I,Q storage
    pub fn interleaved(&self) -> &[f32] {
        &self.data
    }

    /// Complex sample at `index`
    pub fn get(&self, index: usize) -> Option<Complex32> {
        let i = *self.data.get(index * 2)?;
        let q = *self.data.get(index * 2 + 1)?;
        Some(Complex32::new(i, q))
    }

    /// Iterate over complex samples in order
    pub fn iter(&self) -> impl Iterator<Item = Complex32> + '_ {
        self.data
            .chunks_exact(2)
            .map(|pair| Complex32::new(pair[0], pair[1]))
    }

    /// Copy `out.len()` samples starting at `offset` into `out`
    ///
    /// Positions past the end of the capture are zero-filled. Returns the
    /// number of real samples copied.
    pub fn fill_window(&self, offset: usize, out: &mut [Complex32]) -> usize {
        let mut copied = 0;
        for (k, slot) in out.iter_mut().enumerate() {
            match self.get(offset + k) {
                Some(s) => {
                    *slot = s;
                    copied += 1;
                }
                None => *slot = Complex32::new(0.0, 0.0),
            }
        }
        copied
    }

    /// Capture duration in seconds, when the sample rate is known
    pub fn duration_secs(&self) -> Option<f64> {
        self.sample_rate
            .map(|rate| self.len() as f64 / rate.get() as f64)
    }
}
