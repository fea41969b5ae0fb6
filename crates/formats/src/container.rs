//! Container detection and the unified loader

use crate::native::{classify_len, read_native};
use crate::wav::read_wav;
use crate::{FormatError, Result};
use iqkit_core::buffer::{IqSampleBuffer, SourceEncoding};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::num::NonZeroU32;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Supported on-disk containers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerFormat {
    /// RIFF or RF64 WAV, 16-bit PCM
    Wav,
    /// Headerless interleaved I,Q
    Native(SourceEncoding),
}

impl ContainerFormat {
    /// Conventional file extension
    pub fn extension(&self) -> &'static str {
        match self {
            ContainerFormat::Wav => "wav",
            ContainerFormat::Native(SourceEncoding::S8) => "cs8",
            ContainerFormat::Native(SourceEncoding::S16) => "cs16",
        }
    }

    /// Container implied by the extension of `path`, if any
    ///
    /// SigMF and HDF5 extensions are recognized but not supported.
    pub fn from_extension(path: &Path) -> Result<Option<Self>> {
        let ext = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => ext.to_ascii_lowercase(),
            None => return Ok(None),
        };

        match ext.as_str() {
            "wav" | "rf64" => Ok(Some(ContainerFormat::Wav)),
            "cs8" | "s8" => Ok(Some(ContainerFormat::Native(SourceEncoding::S8))),
            "cs16" | "s16" => Ok(Some(ContainerFormat::Native(SourceEncoding::S16))),
            "sigmf-data" | "sigmf-meta" | "sigmf" => Err(FormatError::UnsupportedFormat {
                name: "SigMF".to_string(),
            }),
            "h5" | "hdf5" => Err(FormatError::UnsupportedFormat {
                name: "HDF5".to_string(),
            }),
            _ => Ok(None),
        }
    }

    /// Detect the container of an existing file
    ///
    /// The extension wins when it is recognized; otherwise the first bytes
    /// are checked for a RIFF/RF64 magic and, failing that, the native
    /// encoding is classified by file size.
    pub fn detect<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(format) = Self::from_extension(path)? {
            debug!("{} detected as {} by extension", path.display(), format);
            return Ok(format);
        }

        let mut file = std::fs::File::open(path).map_err(FormatError::file(path))?;
        let len = file.metadata().map_err(FormatError::file(path))?.len();
        let mut magic = Vec::with_capacity(4);
        (&mut file)
            .take(4)
            .read_to_end(&mut magic)
            .map_err(FormatError::file(path))?;

        let format = if magic.as_slice() == b"RIFF" || magic.as_slice() == b"RF64" {
            ContainerFormat::Wav
        } else {
            ContainerFormat::Native(classify_len(len)?)
        };
        info!("{} detected as {} by content", path.display(), format);
        Ok(format)
    }
}

impl std::fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerFormat::Wav => f.write_str("wav"),
            ContainerFormat::Native(e) => write!(f, "{}", e),
        }
    }
}

impl FromStr for ContainerFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "wav" | "rf64" => Ok(ContainerFormat::Wav),
            "s8" | "cs8" => Ok(ContainerFormat::Native(SourceEncoding::S8)),
            "s16" | "cs16" => Ok(ContainerFormat::Native(SourceEncoding::S16)),
            other => Err(FormatError::UnsupportedFormat {
                name: other.to_string(),
            }),
        }
    }
}

/// Load any supported container into a sample buffer
///
/// `format` skips detection. `sample_rate` supplies the rate for native
/// files and overrides the header rate of WAV files.
pub fn load<P: AsRef<Path>>(
    path: P,
    format: Option<ContainerFormat>,
    sample_rate: Option<NonZeroU32>,
) -> Result<IqSampleBuffer> {
    let path = path.as_ref();
    let format = match format {
        Some(f) => f,
        None => ContainerFormat::detect(path)?,
    };

    let buffer = match format {
        ContainerFormat::Wav => {
            let buffer = read_wav(path)?;
            match sample_rate {
                Some(rate) if Some(rate) != buffer.sample_rate() => {
                    info!(
                        "Overriding header sample rate {:?} with {} Hz",
                        buffer.sample_rate().map(|r| r.get()),
                        rate
                    );
                    buffer.with_sample_rate(Some(rate))
                }
                _ => buffer,
            }
        }
        ContainerFormat::Native(encoding) => read_native(path, Some(encoding), sample_rate)?,
    };

    info!(
        "Loaded {} samples from {} ({}, rate {})",
        buffer.len(),
        path.display(),
        format,
        buffer
            .sample_rate()
            .map_or_else(|| "unknown".to_string(), |r| format!("{} Hz", r))
    );
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wav::fixtures::*;
    use std::io::Write;
    use tempfile::Builder;

    fn write_named(suffix: &str, bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_detect_by_extension() {
        assert_eq!(
            ContainerFormat::from_extension(Path::new("a.WAV")).unwrap(),
            Some(ContainerFormat::Wav)
        );
        assert_eq!(
            ContainerFormat::from_extension(Path::new("a.cs8")).unwrap(),
            Some(ContainerFormat::Native(SourceEncoding::S8))
        );
        assert_eq!(ContainerFormat::from_extension(Path::new("capture.bin")).unwrap(), None);
    }

    #[test]
    fn test_sigmf_and_hdf5_are_stubs() {
        for name in ["x.sigmf-data", "x.h5"] {
            assert!(matches!(
                ContainerFormat::from_extension(Path::new(name)),
                Err(FormatError::UnsupportedFormat { .. })
            ));
        }
    }

    #[test]
    fn test_detect_by_content() {
        let wav = riff(&[
            chunk(b"fmt ", &fmt_body(1, 2, 1_000_000, 16)),
            chunk(b"data", &pcm_payload(&[1, 2, 3, 4])),
        ]);
        let file = write_named(".bin", &wav);
        assert_eq!(ContainerFormat::detect(file.path()).unwrap(), ContainerFormat::Wav);

        let file = write_named(".bin", &[0u8; 6]);
        assert_eq!(
            ContainerFormat::detect(file.path()).unwrap(),
            ContainerFormat::Native(SourceEncoding::S8)
        );

        let file = write_named(".bin", &[0u8; 7]);
        assert!(matches!(ContainerFormat::detect(file.path()), Err(FormatError::Decode { .. })));
    }

    #[test]
    fn test_parse_format_names() {
        assert_eq!("S16".parse::<ContainerFormat>().unwrap(), ContainerFormat::Native(SourceEncoding::S16));
        assert_eq!("wav".parse::<ContainerFormat>().unwrap(), ContainerFormat::Wav);
        assert!("f32".parse::<ContainerFormat>().is_err());
    }

    #[test]
    fn test_load_with_rate_override() {
        let wav = riff(&[
            chunk(b"fmt ", &fmt_body(1, 2, 1_000_000, 16)),
            chunk(b"data", &pcm_payload(&[1, 2, 3, 4])),
        ]);
        let file = write_named(".wav", &wav);

        let buffer = load(file.path(), None, None).unwrap();
        assert_eq!(buffer.sample_rate(), NonZeroU32::new(1_000_000));

        let buffer = load(file.path(), None, NonZeroU32::new(2_000_000)).unwrap();
        assert_eq!(buffer.sample_rate(), NonZeroU32::new(2_000_000));
        assert_eq!(buffer.len(), 2);
    }
}
