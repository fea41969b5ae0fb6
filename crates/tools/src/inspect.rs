//! File inspection for `iqls` and `iqkit info`

use anyhow::{Context, Result};
use iqkit_core::buffer::SourceEncoding;
use iqkit_formats::wav::{ContainerKind, WavReader};
use iqkit_formats::ContainerFormat;
use serde::Serialize;
use std::fmt;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

/// What `iqls` reports about one capture
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileSummary {
    pub path: PathBuf,
    pub format: String,
    /// RIFF or RF64 for WAV files
    pub container: Option<ContainerKind>,
    pub encoding: SourceEncoding,
    pub channels: Option<u16>,
    pub sample_rate: Option<NonZeroU32>,
    pub samples: u64,
    pub duration_secs: Option<f64>,
    /// WAV only: whether the header looks like IQ rather than audio
    pub iq_like: Option<bool>,
}

/// Summarize `path` without decoding its samples
///
/// `sample_rate` stands in for a missing rate (native files) and overrides
/// the header rate of WAV files, as when loading.
pub fn inspect(path: &Path, sample_rate: Option<NonZeroU32>) -> Result<FileSummary> {
    let format = ContainerFormat::detect(path)
        .with_context(|| format!("Failed to detect format of {}", path.display()))?;

    let mut summary = match format {
        ContainerFormat::Wav => {
            let reader = WavReader::open(path)?;
            let header = reader.header();
            FileSummary {
                path: path.to_path_buf(),
                format: format.to_string(),
                container: Some(header.kind),
                encoding: SourceEncoding::S16,
                channels: Some(header.channels),
                sample_rate: header.sample_rate(),
                samples: reader.remaining_samples(),
                duration_secs: None,
                iq_like: Some(header.is_iq_like()),
            }
        }
        ContainerFormat::Native(encoding) => {
            let len = std::fs::metadata(path)
                .with_context(|| format!("Failed to stat {}", path.display()))?
                .len();
            FileSummary {
                path: path.to_path_buf(),
                format: format.to_string(),
                container: None,
                encoding,
                channels: None,
                sample_rate: None,
                samples: len / encoding.bytes_per_sample() as u64,
                duration_secs: None,
                iq_like: None,
            }
        }
    };

    if sample_rate.is_some() {
        summary.sample_rate = sample_rate;
    }
    summary.duration_secs = summary
        .sample_rate
        .map(|rate| summary.samples as f64 / rate.get() as f64);
    Ok(summary)
}

impl fmt::Display for FileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.format)?;
        if let Some(kind) = self.container {
            write!(f, " ({})", kind)?;
        }
        write!(f, ", {}", self.encoding)?;
        if let Some(channels) = self.channels {
            write!(f, ", {} ch", channels)?;
        }
        match self.sample_rate {
            Some(rate) => write!(f, ", {} Hz", rate)?,
            None => write!(f, ", rate unknown")?,
        }
        write!(f, ", {} samples", self.samples)?;
        if let Some(d) = self.duration_secs {
            write!(f, ", {:.3} s", d)?;
        }
        if let Some(iq) = self.iq_like {
            write!(f, ", {}", if iq { "IQ" } else { "audio" })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::{generate, SignalSpec};
    use tempfile::tempdir;

    #[test]
    fn test_inspect_wav() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("capture.wav");
        let rate = NonZeroU32::new(250_000).unwrap();
        generate(&path, ContainerFormat::Wav, &SignalSpec::tone(rate, 10_000.0, 0.01)).unwrap();

        let summary = inspect(&path, None).unwrap();
        assert_eq!(summary.format, "wav");
        assert_eq!(summary.container, Some(ContainerKind::Riff));
        assert_eq!(summary.channels, Some(2));
        assert_eq!(summary.sample_rate, Some(rate));
        assert_eq!(summary.samples, 2_500);
        assert_eq!(summary.iq_like, Some(true));
        assert!((summary.duration_secs.unwrap() - 0.01).abs() < 1e-9);

        let line = summary.to_string();
        assert!(line.contains("250000 Hz"));
        assert!(line.ends_with("IQ"));
    }

    #[test]
    fn test_inspect_truncated_wav_counts_present_samples() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("capture.wav");
        let rate = NonZeroU32::new(250_000).unwrap();
        generate(&path, ContainerFormat::Wav, &SignalSpec::tone(rate, 10_000.0, 0.01)).unwrap();

        // Drop the last 100 frames but keep the declared data size
        let mut bytes = std::fs::read(&path).unwrap();
        bytes.truncate(bytes.len() - 400);
        std::fs::write(&path, &bytes).unwrap();

        let summary = inspect(&path, None).unwrap();
        assert_eq!(summary.samples, 2_400);
        assert!((summary.duration_secs.unwrap() - 0.0096).abs() < 1e-9);

        let loaded = iqkit_formats::load(&path, None, None).unwrap();
        assert_eq!(loaded.len() as u64, summary.samples);
    }

    #[test]
    fn test_inspect_native_rate_unknown() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("capture.bin");
        std::fs::write(&path, vec![0u8; 402]).unwrap();

        let summary = inspect(&path, None).unwrap();
        assert_eq!(summary.encoding, SourceEncoding::S8);
        assert_eq!(summary.samples, 201);
        assert_eq!(summary.sample_rate, None);
        assert_eq!(summary.duration_secs, None);
        assert!(summary.to_string().contains("rate unknown"));

        let summary = inspect(&path, NonZeroU32::new(201)).unwrap();
        assert_eq!(summary.duration_secs, Some(1.0));
    }

    #[test]
    fn test_inspect_summary_serializes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("capture.cs16");
        std::fs::write(&path, vec![0u8; 16]).unwrap();

        let json = serde_json::to_value(inspect(&path, None).unwrap()).unwrap();
        assert_eq!(json["samples"], 4);
        assert_eq!(json["format"], "s16");
    }
}
