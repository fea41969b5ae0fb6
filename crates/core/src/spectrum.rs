//! Averaged spectrum accumulation
//!
//! Successive, possibly overlapping windows are transformed, shifted and
//! reduced to power. In spectrum mode the per-bin power is averaged over all
//! frames before conversion to the display scale.

use crate::buffer::{try_vec, IqSampleBuffer};
use crate::fft::{power_spectrum, window::WindowKind, FftPlan};
use crate::{CoreError, Result};
use rustfft::num_complex::Complex32;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Added to power before taking the logarithm
pub const POWER_FLOOR: f32 = 1e-12;

/// Ranges narrower than this are treated as flat
const MIN_RANGE: f32 = 1e-9;

/// Display scale applied to averaged power
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayScale {
    /// `10 * log10(power + 1e-12)`
    #[default]
    LogMag,
    /// `sqrt(power)`
    Linear,
}

impl DisplayScale {
    /// Map a power value onto this scale
    pub fn reduce(&self, power: f32) -> f32 {
        match self {
            DisplayScale::LogMag => 10.0 * (power + POWER_FLOOR).log10(),
            DisplayScale::Linear => power.sqrt(),
        }
    }

    /// Axis unit label
    pub fn unit(&self) -> &'static str {
        match self {
            DisplayScale::LogMag => "dB",
            DisplayScale::Linear => "",
        }
    }
}

/// Minimum and maximum of reduced values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f32,
    pub max: f32,
}

impl Default for ValueRange {
    fn default() -> Self {
        Self::empty()
    }
}

impl ValueRange {
    /// Range containing nothing yet
    pub fn empty() -> Self {
        Self {
            min: f32::INFINITY,
            max: f32::NEG_INFINITY,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    pub fn include(&mut self, value: f32) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn merge(&mut self, other: &ValueRange) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Normalization denominator; a flat range counts as 1.0
    pub fn span(&self) -> f32 {
        let span = self.max - self.min;
        if span.is_finite() && span > MIN_RANGE {
            span
        } else {
            1.0
        }
    }

    /// Map `value` into [0, 1]
    pub fn normalize(&self, value: f32) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        ((value - self.min) / self.span()).clamp(0.0, 1.0)
    }
}

/// Window geometry shared by spectrum and waterfall modes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameParams {
    pub fft_size: usize,
    pub hop_size: usize,
    pub window: WindowKind,
    pub scale: DisplayScale,
}

impl FrameParams {
    /// Non-overlapping rectangular windows on the log scale
    pub fn new(fft_size: usize) -> Result<Self> {
        let params = Self {
            fft_size,
            hop_size: fft_size,
            window: WindowKind::Rectangular,
            scale: DisplayScale::LogMag,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn with_hop(mut self, hop_size: usize) -> Self {
        self.hop_size = hop_size;
        self
    }

    pub fn with_window(mut self, window: WindowKind) -> Self {
        self.window = window;
        self
    }

    pub fn with_scale(mut self, scale: DisplayScale) -> Self {
        self.scale = scale;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.fft_size == 0 || !self.fft_size.is_power_of_two() {
            return Err(CoreError::InvalidFftSize { size: self.fft_size });
        }
        if self.hop_size == 0 {
            return Err(CoreError::InvalidParameters {
                msg: "hop size must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Number of windows lying entirely inside `available` samples
    pub fn full_windows(&self, available: usize) -> usize {
        if available < self.fft_size {
            0
        } else {
            (available - self.fft_size) / self.hop_size + 1
        }
    }

    /// Fail unless at least one full window fits
    pub fn require_one_window(&self, available: usize) -> Result<()> {
        if available < self.fft_size {
            return Err(CoreError::InsufficientSamples {
                required: self.fft_size,
                available,
            });
        }
        Ok(())
    }
}

/// Shifted power of one window
#[derive(Debug, Clone, PartialEq)]
pub struct PowerSpectrumFrame {
    /// Position of the frame in processing order
    pub index: usize,
    /// First sample of the window
    pub offset: usize,
    pub power: Vec<f32>,
}

/// Runs the FFT over windows of a capture
#[derive(Debug)]
pub struct FrameProcessor {
    params: FrameParams,
    plan: FftPlan,
    coefficients: Vec<f32>,
    input: Vec<Complex32>,
}

impl FrameProcessor {
    pub fn new(params: FrameParams) -> Result<Self> {
        params.validate()?;
        let plan = FftPlan::forward(params.fft_size)?;
        let coefficients = params.window.coefficients(params.fft_size);
        let input = try_vec(params.fft_size, Complex32::new(0.0, 0.0), "FFT input window")?;

        Ok(Self {
            params,
            plan,
            coefficients,
            input,
        })
    }

    pub fn params(&self) -> &FrameParams {
        &self.params
    }

    /// Shifted power spectrum of the window starting at `offset`
    ///
    /// Samples past the end of the capture are zero-filled.
    pub fn frame_at(
        &mut self,
        samples: &IqSampleBuffer,
        index: usize,
        offset: usize,
    ) -> Result<PowerSpectrumFrame> {
        samples.fill_window(offset, &mut self.input);
        if !self.params.window.is_rectangular() {
            for (s, w) in self.input.iter_mut().zip(self.coefficients.iter()) {
                *s *= *w;
            }
        }

        self.plan.execute_in_place(&mut self.input)?;
        let power = power_spectrum(&self.input, true);
        if power.iter().any(|p| !p.is_finite()) {
            return Err(CoreError::CorruptFrame { index });
        }

        Ok(PowerSpectrumFrame {
            index,
            offset,
            power,
        })
    }
}

/// Running per-bin power sum
#[derive(Debug, Clone)]
pub struct SpectrumAccumulator {
    sum: Vec<f64>,
    frames: usize,
    scale: DisplayScale,
}

impl SpectrumAccumulator {
    pub fn new(fft_size: usize, scale: DisplayScale) -> Result<Self> {
        Ok(Self {
            sum: try_vec(fft_size, 0.0, "spectrum accumulator")?,
            frames: 0,
            scale,
        })
    }

    /// Number of frames accumulated so far
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn add_frame(&mut self, frame: &PowerSpectrumFrame) -> Result<()> {
        if frame.power.len() != self.sum.len() {
            return Err(CoreError::BufferSizeMismatch {
                expected: self.sum.len(),
                actual: frame.power.len(),
            });
        }

        for (acc, &p) in self.sum.iter_mut().zip(frame.power.iter()) {
            *acc += p as f64;
        }
        self.frames += 1;
        Ok(())
    }

    /// Average, reduce to the display scale and compute the value range
    pub fn finalize(self) -> Result<Spectrum> {
        if self.frames == 0 {
            return Err(CoreError::NoUsableFrames { skipped: 0 });
        }

        let n = self.frames as f64;
        let mut range = ValueRange::empty();
        let values: Vec<f32> = self
            .sum
            .iter()
            .map(|&total| {
                let value = self.scale.reduce((total / n) as f32);
                range.include(value);
                value
            })
            .collect();

        Ok(Spectrum {
            values,
            range,
            frames: self.frames,
            scale: self.scale,
        })
    }
}

/// Averaged, reduced spectrum ready for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    values: Vec<f32>,
    range: ValueRange,
    frames: usize,
    scale: DisplayScale,
}

impl Spectrum {
    /// Reduced value per shifted bin
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn range(&self) -> ValueRange {
        self.range
    }

    /// Frames that contributed to the average
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn scale(&self) -> DisplayScale {
        self.scale
    }

    /// Value of `bin` normalized against the spectrum's own range
    pub fn normalized(&self, bin: usize) -> f32 {
        self.values
            .get(bin)
            .map_or(0.0, |&v| self.range.normalize(v))
    }

    /// Index of the strongest bin
    pub fn peak_bin(&self) -> Option<usize> {
        self.values
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)
    }
}

/// Average `averages` windows (all full windows when `None`) into one spectrum
///
/// A window whose start lies inside the capture but whose end does not is
/// zero-filled and still contributes.
pub fn compute_spectrum(
    samples: &IqSampleBuffer,
    params: &FrameParams,
    averages: Option<usize>,
) -> Result<Spectrum> {
    params.validate()?;
    params.require_one_window(samples.len())?;

    let frames = match averages {
        Some(0) => {
            return Err(CoreError::InvalidParameters {
                msg: "averaging count must be at least 1".to_string(),
            })
        }
        Some(k) => {
            let last_offset = (k - 1).saturating_mul(params.hop_size);
            if last_offset >= samples.len() {
                return Err(CoreError::InsufficientSamples {
                    required: last_offset.saturating_add(1),
                    available: samples.len(),
                });
            }
            k
        }
        None => params.full_windows(samples.len()),
    };

    let mut processor = FrameProcessor::new(*params)?;
    let mut accumulator = SpectrumAccumulator::new(params.fft_size, params.scale)?;
    let mut skipped = 0;

    for index in 0..frames {
        match processor.frame_at(samples, index, index * params.hop_size) {
            Ok(frame) => accumulator.add_frame(&frame)?,
            Err(CoreError::CorruptFrame { index }) => {
                warn!("Skipping frame {} with non-finite power", index);
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    if accumulator.frames() == 0 {
        return Err(CoreError::NoUsableFrames { skipped });
    }

    let spectrum = accumulator.finalize()?;
    debug!(
        "Averaged {} frame(s) of {} bins ({} skipped), range {:.2}..{:.2}",
        spectrum.frames(),
        spectrum.len(),
        skipped,
        spectrum.range().min,
        spectrum.range().max
    );
    Ok(spectrum)
}
