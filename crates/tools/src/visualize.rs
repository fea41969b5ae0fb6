//! Spectrum and waterfall PNG generation

use crate::common::artifact_path;
use crate::config::VizConfig;
use anyhow::{Context, Result};
use clap::ValueEnum;
use iqkit_core::buffer::IqSampleBuffer;
use iqkit_core::spectrum::compute_spectrum;
use iqkit_core::waterfall::compute_waterfall;
use iqkit_formats::{load, ContainerFormat};
use iqkit_render::axis::AxisSpec;
use iqkit_render::image::RenderImage;
use iqkit_render::plot::{render_spectrum, render_waterfall};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Visualization artifacts
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Plot {
    Spectrum,
    Waterfall,
}

impl Plot {
    pub const ALL: [Plot; 2] = [Plot::Spectrum, Plot::Waterfall];

    /// Suffix used in `<prefix>_<name>.png`
    pub fn name(&self) -> &'static str {
        match self {
            Plot::Spectrum => "spectrum",
            Plot::Waterfall => "waterfall",
        }
    }
}

/// Load a capture using the rate override from `config`
pub fn load_capture(input: &Path, format: Option<ContainerFormat>, config: &VizConfig) -> Result<IqSampleBuffer> {
    let samples = load(input, format, config.sample_rate)
        .with_context(|| format!("Failed to load {}", input.display()))?;
    if samples.sample_rate().is_none() {
        warn!(
            "Sample rate of {} is unknown; frequency axis will be labelled in FFT bins (use --sample-rate)",
            input.display()
        );
    }
    Ok(samples)
}

fn axes(samples: &IqSampleBuffer, config: &VizConfig) -> AxisSpec {
    AxisSpec::new(config.center_freq, samples.sample_rate())
}

/// Averaged spectrum plot
pub fn spectrum_image(samples: &IqSampleBuffer, config: &VizConfig) -> Result<RenderImage> {
    let spectrum = compute_spectrum(samples, &config.frame_params()?, config.averages)
        .context("Failed to compute spectrum")?;
    info!("Averaged {} frame(s) of {} bins", spectrum.frames(), spectrum.len());
    Ok(render_spectrum(&spectrum, &config.layout()?, &axes(samples, config))?)
}

/// Waterfall plot, earliest frame at the bottom
pub fn waterfall_image(samples: &IqSampleBuffer, config: &VizConfig) -> Result<RenderImage> {
    let waterfall = compute_waterfall(samples, &config.waterfall_params()?)
        .context("Failed to compute waterfall")?;
    info!("Computed {} waterfall frame(s)", waterfall.frames());
    Ok(render_waterfall(&waterfall, &config.layout()?, &axes(samples, config))?)
}

/// Render `plot` and write it next to `prefix`; returns the written path
pub fn write_plot(samples: &IqSampleBuffer, config: &VizConfig, plot: Plot, prefix: &Path) -> Result<PathBuf> {
    let start = Instant::now();
    let image = match plot {
        Plot::Spectrum => spectrum_image(samples, config)?,
        Plot::Waterfall => waterfall_image(samples, config)?,
    };
    let path = artifact_path(prefix, plot.name());
    image.save_png(&path)?;
    info!("{} written in {:.2?}", path.display(), start.elapsed());
    Ok(path)
}

/// Load `input` and write each requested plot
pub fn visualize(
    input: &Path,
    format: Option<ContainerFormat>,
    prefix: &Path,
    config: &VizConfig,
    plots: &[Plot],
) -> Result<Vec<PathBuf>> {
    let samples = load_capture(input, format, config)?;
    plots
        .iter()
        .map(|&plot| write_plot(&samples, config, plot, prefix))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::{generate, SignalSpec};
    use iqkit_core::buffer::SourceEncoding;
    use std::num::NonZeroU32;
    use tempfile::tempdir;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn small_config() -> VizConfig {
        VizConfig {
            fft_size: 256,
            width: 320,
            height: 160,
            ..VizConfig::default()
        }
    }

    #[test]
    fn test_visualize_writes_both_artifacts() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("tone.wav");
        let rate = NonZeroU32::new(96_000).unwrap();
        generate(&input, ContainerFormat::Wav, &SignalSpec::tone(rate, 12_000.0, 0.1)).unwrap();

        let prefix = dir.path().join("out");
        let written = visualize(&input, None, &prefix, &small_config(), &Plot::ALL).unwrap();
        assert_eq!(written, vec![dir.path().join("out_spectrum.png"), dir.path().join("out_waterfall.png")]);
        for path in written {
            let bytes = std::fs::read(&path).unwrap();
            assert_eq!(&bytes[..8], &PNG_MAGIC);
        }
    }

    #[test]
    fn test_native_capture_without_rate_still_renders() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("tone.cs8");
        let rate = NonZeroU32::new(1_000_000).unwrap();
        generate(&input, ContainerFormat::Native(SourceEncoding::S8), &SignalSpec::tone(rate, 100_000.0, 0.01))
            .unwrap();

        let samples = load_capture(&input, None, &small_config()).unwrap();
        assert_eq!(samples.sample_rate(), None);
        let image = spectrum_image(&samples, &small_config()).unwrap();
        assert_eq!((image.width(), image.height()), (320, 160));
    }

    #[test]
    fn test_short_capture_fails_without_output() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("short.cs16");
        std::fs::write(&input, vec![0u8; 4 * 100]).unwrap();

        let prefix = dir.path().join("short");
        let err = visualize(&input, None, &prefix, &small_config(), &[Plot::Spectrum]).unwrap_err();
        assert!(format!("{:#}", err).contains("Insufficient"));
        assert!(!artifact_path(&prefix, "spectrum").exists());
    }
}
