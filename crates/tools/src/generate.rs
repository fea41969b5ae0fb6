//! Test-signal generation
//!
//! Produces complex tones and linear sweeps and writes them in any of the
//! supported containers, mainly for demos and end-to-end checks.

use anyhow::{Context, Result};
use clap::ValueEnum;
use iqkit_core::buffer::{try_vec, SourceEncoding};
use iqkit_core::Complex32;
use iqkit_formats::ContainerFormat;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::num::NonZeroU32;
use std::path::Path;
use tracing::info;

/// Kinds of generated signal
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalType {
    /// Constant complex exponential at `frequency`
    Tone,
    /// Linear sweep from `frequency` to `end_frequency`
    Sweep,
}

/// Everything needed to synthesize a signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSpec {
    pub signal: SignalType,
    pub sample_rate: NonZeroU32,
    /// Offset from the center frequency in Hz; negative values lie below it
    pub frequency: f64,
    pub end_frequency: f64,
    pub duration: f64,
    /// Peak amplitude relative to full scale
    pub amplitude: f64,
}

impl SignalSpec {
    pub fn tone(sample_rate: NonZeroU32, frequency: f64, duration: f64) -> Self {
        Self {
            signal: SignalType::Tone,
            sample_rate,
            frequency,
            end_frequency: frequency,
            duration,
            amplitude: 0.5,
        }
    }

    pub fn samples(&self) -> usize {
        (self.sample_rate.get() as f64 * self.duration).round() as usize
    }

    pub fn validate(&self) -> Result<()> {
        let nyquist = self.sample_rate.get() as f64 / 2.0;
        if !(self.duration > 0.0) || !self.duration.is_finite() {
            anyhow::bail!("duration must be positive, got {}", self.duration);
        }
        if !(self.amplitude > 0.0 && self.amplitude <= 1.0) {
            anyhow::bail!("amplitude must be in (0, 1], got {}", self.amplitude);
        }
        for f in [self.frequency, self.end_frequency] {
            if !(f.abs() <= nyquist) {
                anyhow::bail!("frequency {} Hz lies outside +/-{} Hz", f, nyquist);
            }
        }
        if self.samples() == 0 {
            anyhow::bail!("duration {} s is shorter than one sample", self.duration);
        }
        Ok(())
    }
}

/// Synthesize the normalized complex samples described by `spec`
pub fn synthesize(spec: &SignalSpec) -> Result<Vec<Complex32>> {
    spec.validate()?;
    let count = spec.samples();
    let fs = spec.sample_rate.get() as f64;
    let mut samples = try_vec(count, Complex32::default(), "generated signal")?;

    let sweep_rate = match spec.signal {
        SignalType::Tone => 0.0,
        SignalType::Sweep => (spec.end_frequency - spec.frequency) / count as f64,
    };

    let mut phase = 0.0f64;
    for (i, sample) in samples.iter_mut().enumerate() {
        let freq = spec.frequency + sweep_rate * i as f64;
        *sample = Complex32::new(
            (spec.amplitude * phase.cos()) as f32,
            (spec.amplitude * phase.sin()) as f32,
        );
        phase = (phase + 2.0 * std::f64::consts::PI * freq / fs) % (2.0 * std::f64::consts::PI);
    }

    info!("Generated {:?} signal: {} samples at {} Hz", spec.signal, count, fs);
    Ok(samples)
}

fn quantize(v: f32, full_scale: f32) -> i32 {
    (v * full_scale).round().clamp(-full_scale, full_scale - 1.0) as i32
}

/// Write `samples` to `path` in `format`; returns the samples written
pub fn write_samples(
    path: &Path,
    format: ContainerFormat,
    sample_rate: NonZeroU32,
    samples: &[Complex32],
) -> Result<u64> {
    match format {
        ContainerFormat::Wav => {
            let spec = hound::WavSpec {
                channels: 2,
                sample_rate: sample_rate.get(),
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            };
            let scale = SourceEncoding::S16.full_scale();
            let mut writer = hound::WavWriter::create(path, spec)
                .with_context(|| format!("Failed to create WAV file: {}", path.display()))?;
            for s in samples {
                writer.write_sample(quantize(s.re, scale) as i16)?;
                writer.write_sample(quantize(s.im, scale) as i16)?;
            }
            writer.finalize()?;
        }
        ContainerFormat::Native(encoding) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            let scale = encoding.full_scale();
            for s in samples {
                for v in [s.re, s.im] {
                    let q = quantize(v, scale);
                    match encoding {
                        SourceEncoding::S8 => writer.write_all(&(q as i8).to_le_bytes())?,
                        SourceEncoding::S16 => writer.write_all(&(q as i16).to_le_bytes())?,
                    }
                }
            }
            writer
                .flush()
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
    }

    info!("Wrote {} samples to {} ({})", samples.len(), path.display(), format);
    Ok(samples.len() as u64)
}

/// Synthesize and write in one step
pub fn generate(path: &Path, format: ContainerFormat, spec: &SignalSpec) -> Result<u64> {
    let samples = synthesize(spec)?;
    write_samples(path, format, spec.sample_rate, &samples)
}
