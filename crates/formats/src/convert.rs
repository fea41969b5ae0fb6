//! Container-to-container conversion
//!
//! Conversions never rescale sample values. Anything that would change the
//! bit depth is rejected before any output is written. Output is staged in a
//! temporary file, so a failed conversion leaves an existing destination as
//! it was.

use crate::container::ContainerFormat;
use crate::native::{copy_native, read_s16_pairs, write_s16_pairs};
use crate::staging::write_staged;
use crate::wav::{WavReader, DEFAULT_CHUNK_SAMPLES};
use crate::{FormatError, Result};
use iqkit_core::buffer::SourceEncoding;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::num::NonZeroU32;
use std::path::Path;
use tracing::info;

/// Outcome of a successful conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionReport {
    pub from: ContainerFormat,
    pub to: ContainerFormat,
    /// Complex samples written
    pub samples: u64,
}

/// Whether `from` can be converted to `to` without changing bit depth
pub fn is_supported(from: ContainerFormat, to: ContainerFormat) -> bool {
    use ContainerFormat::*;
    match (from, to) {
        (Native(a), Native(b)) => a == b,
        (Wav, Native(SourceEncoding::S16)) | (Native(SourceEncoding::S16), Wav) | (Wav, Wav) => true,
        _ => false,
    }
}

/// Convert `input` into `output` in the `to` container
///
/// `sample_rate` is required when the input carries none and the output is
/// WAV; it also overrides the header rate when rewriting WAV files.
pub fn convert<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    from: Option<ContainerFormat>,
    to: ContainerFormat,
    sample_rate: Option<NonZeroU32>,
) -> Result<ConversionReport> {
    let (input, output) = (input.as_ref(), output.as_ref());
    let from = match from {
        Some(f) => f,
        None => ContainerFormat::detect(input)?,
    };

    if !is_supported(from, to) {
        return Err(FormatError::UnsupportedConversion {
            from: from.to_string(),
            to: to.to_string(),
        });
    }

    info!("Converting {} ({}) to {} ({})", input.display(), from, output.display(), to);
    let samples = match (from, to) {
        (ContainerFormat::Native(a), ContainerFormat::Native(b)) => {
            copy_native(input, output, a, b)? / a.bytes_per_sample() as u64
        }
        (ContainerFormat::Wav, ContainerFormat::Native(_)) => {
            write_staged(output, |staged| wav_to_s16(input, staged))?
        }
        (ContainerFormat::Native(_), ContainerFormat::Wav) => {
            let rate = sample_rate.ok_or(FormatError::MissingSampleRate)?;
            let pairs = read_s16_pairs(input)?;
            write_staged(output, |staged| {
                write_wav(staged, rate, |writer| {
                    write_pairs(writer, &pairs)?;
                    Ok(pairs.len() as u64)
                })
            })?
        }
        (ContainerFormat::Wav, ContainerFormat::Wav) => {
            write_staged(output, |staged| wav_to_wav(input, staged, sample_rate))?
        }
    };

    info!("Wrote {} samples to {}", samples, output.display());
    Ok(ConversionReport { from, to, samples })
}

fn wav_to_s16(input: &Path, output: &Path) -> Result<u64> {
    let mut reader = WavReader::open(input)?;
    let file = File::create(output).map_err(FormatError::file(output))?;
    let mut writer = BufWriter::new(file);

    let mut samples = 0u64;
    while let Some(pairs) = reader.read_raw_chunk(DEFAULT_CHUNK_SAMPLES)? {
        write_s16_pairs(&mut writer, &pairs).map_err(FormatError::file(output))?;
        samples += pairs.len() as u64;
    }
    writer.flush().map_err(FormatError::file(output))?;
    Ok(samples)
}

fn wav_to_wav(input: &Path, output: &Path, sample_rate: Option<NonZeroU32>) -> Result<u64> {
    let mut reader = WavReader::open(input)?;
    let rate = sample_rate
        .or_else(|| reader.header().sample_rate())
        .ok_or(FormatError::MissingSampleRate)?;

    write_wav(output, rate, |writer| {
        let mut samples = 0u64;
        while let Some(pairs) = reader.read_raw_chunk(DEFAULT_CHUNK_SAMPLES)? {
            write_pairs(writer, &pairs)?;
            samples += pairs.len() as u64;
        }
        Ok(samples)
    })
}

type PcmWriter = hound::WavWriter<BufWriter<File>>;

/// Write a 2-channel 16-bit PCM file, I on the left and Q on the right
fn write_wav<F>(output: &Path, sample_rate: NonZeroU32, body: F) -> Result<u64>
where
    F: FnOnce(&mut PcmWriter) -> Result<u64>,
{
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: sample_rate.get(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(output, spec)?;
    let samples = body(&mut writer)?;
    writer.finalize()?;
    Ok(samples)
}

fn write_pairs(writer: &mut PcmWriter, pairs: &[[i16; 2]]) -> Result<()> {
    for &[i, q] in pairs {
        writer.write_sample(i)?;
        writer.write_sample(q)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::load;
    use crate::wav::fixtures::*;
    use crate::wav::read_wav;
    use tempfile::tempdir;

    fn s16_bytes(values: &[i16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_support_matrix() {
        use ContainerFormat::*;
        assert!(is_supported(Native(SourceEncoding::S8), Native(SourceEncoding::S8)));
        assert!(is_supported(Wav, Native(SourceEncoding::S16)));
        assert!(!is_supported(Native(SourceEncoding::S8), Native(SourceEncoding::S16)));
        assert!(!is_supported(Wav, Native(SourceEncoding::S8)));
        assert!(!is_supported(Native(SourceEncoding::S8), Wav));
    }

    #[test]
    fn test_s16_copy_roundtrip_400_bytes() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.cs16");
        let output = dir.path().join("out.cs16");
        let values: Vec<i16> = (0..200).map(|i| (i * 331 - 30000) as i16).collect();
        let bytes = s16_bytes(&values);
        assert_eq!(bytes.len(), 400);
        std::fs::write(&input, &bytes).unwrap();

        let target = ContainerFormat::Native(SourceEncoding::S16);
        let report = convert(&input, &output, None, target, None).unwrap();
        assert_eq!(report.samples, 100);
        assert_eq!(std::fs::read(&output).unwrap(), bytes);
    }

    #[test]
    fn test_unsupported_conversion_leaves_no_output() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.cs8");
        let output = dir.path().join("out.cs16");
        std::fs::write(&input, [1u8, 2, 3, 4]).unwrap();

        let result = convert(&input, &output, None, ContainerFormat::Native(SourceEncoding::S16), None);
        assert!(matches!(result, Err(FormatError::UnsupportedConversion { .. })));
        assert!(!output.exists());
    }

    #[test]
    fn test_failed_conversion_keeps_existing_output() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("precious.cs16");
        let mut bad = riff(&[chunk(b"fmt ", &fmt_body(1, 2, 500_000, 16)), chunk(b"data", &pcm_payload(&[1, 2]))]);
        bad[0..4].copy_from_slice(b"RIFX");
        std::fs::write(&input, &bad).unwrap();
        std::fs::write(&output, b"user data").unwrap();

        let result = convert(&input, &output, None, ContainerFormat::Native(SourceEncoding::S16), None);
        assert!(matches!(result, Err(FormatError::Decode { .. })));
        assert_eq!(std::fs::read(&output).unwrap(), b"user data");

        let result = convert(&input, &output, None, ContainerFormat::Wav, None);
        assert!(result.is_err());
        assert_eq!(std::fs::read(&output).unwrap(), b"user data");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_wav_to_s16_extracts_payload() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.cs16");
        let values = [10i16, -10, 300, -300, 32767, -32768];
        std::fs::write(
            &input,
            riff(&[chunk(b"fmt ", &fmt_body(1, 1, 500_000, 16)), chunk(b"data", &pcm_payload(&values))]),
        )
        .unwrap();

        let report = convert(&input, &output, None, ContainerFormat::Native(SourceEncoding::S16), None).unwrap();
        assert_eq!(report.samples, 3);
        assert_eq!(std::fs::read(&output).unwrap(), s16_bytes(&values));
    }

    #[test]
    fn test_s16_to_wav_needs_rate() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.cs16");
        let output = dir.path().join("out.wav");
        std::fs::write(&input, s16_bytes(&[1, 2, 3, 4])).unwrap();

        let result = convert(&input, &output, None, ContainerFormat::Wav, None);
        assert!(matches!(result, Err(FormatError::MissingSampleRate)));
        assert!(!output.exists());
    }

    #[test]
    fn test_s16_to_wav_and_back_preserves_samples() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.cs16");
        let wav = dir.path().join("mid.wav");
        let values: Vec<i16> = (0..64).map(|i| (i * 997 % 65536 - 32768) as i16).collect();
        std::fs::write(&input, s16_bytes(&values)).unwrap();

        let rate = NonZeroU32::new(250_000);
        convert(&input, &wav, None, ContainerFormat::Wav, rate).unwrap();

        let original = load(&input, None, rate).unwrap();
        let through_wav = read_wav(&wav).unwrap();
        assert_eq!(original, through_wav);
    }

    #[test]
    fn test_wav_rewrite_normalizes_rf64() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.wav");
        let payload = pcm_payload(&[5, 6, 7, 8]);
        std::fs::write(&input, rf64(&fmt_body(1, 2, 192_000, 16), &payload)).unwrap();

        let report = convert(&input, &output, None, ContainerFormat::Wav, None).unwrap();
        assert_eq!(report.samples, 2);
        assert_eq!(read_wav(&input).unwrap(), read_wav(&output).unwrap());
    }
}
