//! Visualization configuration
//!
//! Settings come from defaults, optionally replaced by a TOML file, and are
//! finally overridden by whatever flags were given on the command line.

use crate::common::{ScaleArg, WindowArg};
use anyhow::{Context, Result};
use clap::Args;
use iqkit_core::fft::window::WindowKind;
use iqkit_core::spectrum::{DisplayScale, FrameParams};
use iqkit_core::waterfall::WaterfallParams;
use iqkit_render::plot::PlotLayout;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

/// Spectrum and waterfall parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VizConfig {
    pub fft_size: usize,
    /// Defaults to `fft_size` (no overlap)
    pub hop_size: Option<usize>,
    /// Spectrum frames to average; all full windows when unset
    pub averages: Option<usize>,
    pub max_frames: usize,
    pub width: usize,
    pub height: usize,
    pub scale: DisplayScale,
    pub window: WindowKind,
    /// Tuned center frequency in Hz
    pub center_freq: f64,
    /// Overrides the rate in the file header; required for labelled
    /// frequency axes on native captures
    pub sample_rate: Option<NonZeroU32>,
}

impl Default for VizConfig {
    fn default() -> Self {
        Self {
            fft_size: 1024,
            hop_size: None,
            averages: None,
            max_frames: 1024,
            width: 1024,
            height: 512,
            scale: DisplayScale::LogMag,
            window: WindowKind::Rectangular,
            center_freq: 0.0,
            sample_rate: None,
        }
    }
}

impl VizConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn hop(&self) -> usize {
        self.hop_size.unwrap_or(self.fft_size)
    }

    pub fn frame_params(&self) -> Result<FrameParams> {
        let params = FrameParams::new(self.fft_size)?
            .with_hop(self.hop())
            .with_window(self.window)
            .with_scale(self.scale);
        params.validate()?;
        Ok(params)
    }

    pub fn layout(&self) -> Result<PlotLayout> {
        Ok(PlotLayout::new(self.width, self.height)?)
    }

    /// Waterfall geometry with one frame per graph row at most
    pub fn waterfall_params(&self) -> Result<WaterfallParams> {
        let params = WaterfallParams {
            frame: self.frame_params()?,
            max_frames: self.max_frames,
            target_rows: self.layout()?.graph_height(),
        };
        params.validate()?;
        Ok(params)
    }

    /// Reject settings that cannot produce a plot
    pub fn validate(&self) -> Result<()> {
        if self.averages == Some(0) {
            anyhow::bail!("averages must be at least 1");
        }
        if !self.center_freq.is_finite() {
            anyhow::bail!("center frequency must be finite");
        }
        self.waterfall_params().context("Invalid visualization settings")?;
        Ok(())
    }
}

/// Command-line flags shared by every visualization command
#[derive(Args, Debug, Clone, Default)]
pub struct VizArgs {
    /// TOML configuration file; flags below override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// FFT size (power of two)
    #[arg(long)]
    pub fft_size: Option<usize>,

    /// Samples between frame starts
    #[arg(long)]
    pub hop_size: Option<usize>,

    /// Spectrum frames to average
    #[arg(long)]
    pub averages: Option<usize>,

    /// Maximum waterfall frames
    #[arg(long)]
    pub max_frames: Option<usize>,

    /// Image width in pixels
    #[arg(long)]
    pub width: Option<usize>,

    /// Image height in pixels
    #[arg(long)]
    pub height: Option<usize>,

    /// Display scale
    #[arg(long, value_enum)]
    pub scale: Option<ScaleArg>,

    /// Window function
    #[arg(long, value_enum)]
    pub window: Option<WindowArg>,

    /// Center frequency in Hz
    #[arg(long)]
    pub center_freq: Option<f64>,

    /// Sample rate in Hz, overriding the file header
    #[arg(long)]
    pub sample_rate: Option<NonZeroU32>,
}

impl VizArgs {
    /// Defaults, then the config file, then flags; validated
    pub fn resolve(&self) -> Result<VizConfig> {
        let mut config = match &self.config {
            Some(path) => VizConfig::from_file(path)?,
            None => VizConfig::default(),
        };
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply(&self, config: &mut VizConfig) {
        if let Some(v) = self.fft_size {
            config.fft_size = v;
        }
        if let Some(v) = self.hop_size {
            config.hop_size = Some(v);
        }
        if let Some(v) = self.averages {
            config.averages = Some(v);
        }
        if let Some(v) = self.max_frames {
            config.max_frames = v;
        }
        if let Some(v) = self.width {
            config.width = v;
        }
        if let Some(v) = self.height {
            config.height = v;
        }
        if let Some(v) = self.scale {
            config.scale = v.into();
        }
        if let Some(v) = self.window {
            config.window = v.into();
        }
        if let Some(v) = self.center_freq {
            config.center_freq = v;
        }
        if let Some(v) = self.sample_rate {
            config.sample_rate = Some(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_serialization() {
        let config = VizConfig {
            fft_size: 2048,
            hop_size: Some(512),
            scale: DisplayScale::Linear,
            window: WindowKind::Hann,
            center_freq: 145.5e6,
            sample_rate: NonZeroU32::new(2_400_000),
            ..VizConfig::default()
        };

        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();

        config.save_to_file(&path).unwrap();
        let loaded = VizConfig::from_file(&path).unwrap();

        assert_eq!(config, loaded);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: VizConfig = toml::from_str("fft_size = 4096\nscale = \"linear\"\n").unwrap();
        assert_eq!(config.fft_size, 4096);
        assert_eq!(config.scale, DisplayScale::Linear);
        assert_eq!(config.width, 1024);
        assert_eq!(config.hop(), 4096);
        assert_eq!(config.sample_rate, None);
    }

    #[test]
    fn test_flags_override_file() {
        let temp_file = NamedTempFile::new().unwrap();
        let file_config = VizConfig {
            fft_size: 512,
            width: 800,
            ..VizConfig::default()
        };
        file_config.save_to_file(temp_file.path()).unwrap();

        let args = VizArgs {
            config: Some(temp_file.path().to_path_buf()),
            fft_size: Some(256),
            window: Some(WindowArg::Blackman),
            ..VizArgs::default()
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.fft_size, 256);
        assert_eq!(config.width, 800);
        assert_eq!(config.window, WindowKind::Blackman);
    }

    #[test]
    fn test_validation() {
        assert!(VizConfig::default().validate().is_ok());

        let bad = [
            VizConfig { fft_size: 1000, ..VizConfig::default() },
            VizConfig { hop_size: Some(0), ..VizConfig::default() },
            VizConfig { averages: Some(0), ..VizConfig::default() },
            VizConfig { max_frames: 0, ..VizConfig::default() },
            VizConfig { width: 32, ..VizConfig::default() },
            VizConfig { height: 20, ..VizConfig::default() },
        ];
        for config in bad {
            assert!(config.validate().is_err(), "{:?} should be rejected", config);
        }
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = VizConfig::from_file(Path::new("/nonexistent/iqkit.toml")).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/iqkit.toml"));
    }
}
