//! Headerless native IQ files
//!
//! The whole file is sample data: interleaved I,Q as signed 8-bit (`s8`) or
//! signed 16-bit little-endian (`s16`) values.

use crate::staging::write_staged;
use crate::{FormatError, Result};
use iqkit_core::buffer::{IqSampleBuffer, SourceEncoding};
use iqkit_core::CoreError;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::num::NonZeroU32;
use std::path::Path;
use tracing::{debug, info};

/// Guess the encoding of a headerless file from its size
///
/// Sizes divisible by 4 are taken as `s16`, other even sizes as `s8`.
pub fn classify_len(len: u64) -> Result<SourceEncoding> {
    if len % 4 == 0 {
        Ok(SourceEncoding::S16)
    } else if len % 2 == 0 {
        Ok(SourceEncoding::S8)
    } else {
        Err(FormatError::decode(format!(
            "ambiguous native IQ file: {} bytes is not a whole number of s8 or s16 pairs",
            len
        )))
    }
}

/// [`classify_len`] applied to the size of `path`
pub fn classify_file<P: AsRef<Path>>(path: P) -> Result<SourceEncoding> {
    let path = path.as_ref();
    let len = std::fs::metadata(path).map_err(FormatError::file(path))?.len();
    classify_len(len)
}

/// Decode raw bytes into interleaved normalized I,Q values
///
/// A trailing partial sample is dropped.
pub fn decode_bytes(bytes: &[u8], encoding: SourceEncoding) -> Vec<f32> {
    let scale = encoding.full_scale();
    let whole = bytes.len() - bytes.len() % encoding.bytes_per_sample();
    let bytes = &bytes[..whole];

    match encoding {
        SourceEncoding::S8 => bytes.iter().map(|&b| b as i8 as f32 / scale).collect(),
        SourceEncoding::S16 => bytes
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / scale)
            .collect(),
    }
}

/// Read the entire file into memory, reporting allocation failure
pub(crate) fn read_file_bytes(path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path).map_err(FormatError::file(path))?;
    let len = file.metadata().map_err(FormatError::file(path))?.len() as usize;

    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(len)
        .map_err(|_| CoreError::AllocationFailure {
            what: "native IQ file",
            bytes: len,
        })?;
    file.read_to_end(&mut bytes).map_err(FormatError::file(path))?;
    Ok(bytes)
}

/// Load a native IQ file
///
/// With no `encoding` the format is classified from the file size. Native
/// files carry no sample rate; it stays unknown unless `sample_rate` is given.
pub fn read_native<P: AsRef<Path>>(
    path: P,
    encoding: Option<SourceEncoding>,
    sample_rate: Option<NonZeroU32>,
) -> Result<IqSampleBuffer> {
    let path = path.as_ref();
    let bytes = read_file_bytes(path)?;
    let encoding = match encoding {
        Some(e) => e,
        None => {
            let guessed = classify_len(bytes.len() as u64)?;
            info!("Classified {} as {} by size", path.display(), guessed);
            guessed
        }
    };

    let data = decode_bytes(&bytes, encoding);
    debug!(
        "Decoded {} {} samples from {}",
        data.len() / 2,
        encoding,
        path.display()
    );
    Ok(IqSampleBuffer::from_interleaved(data, sample_rate, encoding)?)
}

/// Raw 16-bit I,Q pairs of an `s16` file
pub(crate) fn read_s16_pairs(path: &Path) -> Result<Vec<[i16; 2]>> {
    let bytes = read_file_bytes(path)?;
    Ok(bytes
        .chunks_exact(4)
        .map(|b| {
            [
                i16::from_le_bytes([b[0], b[1]]),
                i16::from_le_bytes([b[2], b[3]]),
            ]
        })
        .collect())
}

/// Write I,Q pairs as an `s16` file
pub(crate) fn write_s16_pairs<W: Write>(writer: &mut BufWriter<W>, pairs: &[[i16; 2]]) -> std::io::Result<()> {
    for [i, q] in pairs {
        writer.write_all(&i.to_le_bytes())?;
        writer.write_all(&q.to_le_bytes())?;
    }
    Ok(())
}

/// Copy a native file to another native file
///
/// Only same-format copies are supported; they are byte-exact. The copy is
/// staged beside `output`, so copying a file onto itself leaves it intact.
/// Returns the number of bytes written.
pub fn copy_native<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    from: SourceEncoding,
    to: SourceEncoding,
) -> Result<u64> {
    if from != to {
        return Err(FormatError::UnsupportedConversion {
            from: from.to_string(),
            to: to.to_string(),
        });
    }

    let (input, output) = (input.as_ref(), output.as_ref());
    write_staged(output, |staged| {
        std::fs::copy(input, staged).map_err(FormatError::file(input))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use iqkit_core::Complex32;
    use quickcheck_macros::quickcheck;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    fn write_temp(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_classify_by_size() {
        assert_eq!(classify_len(400).unwrap(), SourceEncoding::S16);
        assert_eq!(classify_len(402).unwrap(), SourceEncoding::S8);
        assert!(matches!(classify_len(401), Err(FormatError::Decode { .. })));
    }

    #[test]
    fn test_decode_s8() {
        let data = decode_bytes(&[0x80, 0x7F, 0x00, 0x40], SourceEncoding::S8);
        assert_eq!(data, vec![-1.0, 127.0 / 128.0, 0.0, 0.5]);
    }

    #[test]
    fn test_decode_s16_drops_partial_sample() {
        let mut bytes = Vec::new();
        for v in [16384i16, -32768, 0, 1] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes.extend_from_slice(&[0x11, 0x22]);
        let data = decode_bytes(&bytes, SourceEncoding::S16);
        assert_eq!(data.len(), 4);
        assert_eq!(data[0], 0.5);
        assert_eq!(data[1], -1.0);
    }

    #[test]
    fn test_read_native_keeps_rate_unknown() {
        let file = write_temp(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let buffer = read_native(file.path(), None, None).unwrap();
        assert_eq!(buffer.encoding(), SourceEncoding::S16);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.sample_rate(), None);

        let buffer = read_native(file.path(), Some(SourceEncoding::S8), NonZeroU32::new(2_048_000)).unwrap();
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.get(0), Some(Complex32::new(1.0 / 128.0, 2.0 / 128.0)));
        assert_eq!(buffer.sample_rate(), NonZeroU32::new(2_048_000));
    }

    #[test]
    fn test_copy_is_byte_exact() {
        let bytes: Vec<u8> = (0..400u32).map(|i| (i * 7 % 256) as u8).collect();
        let input = write_temp(&bytes);
        let dir = tempdir().unwrap();
        let output = dir.path().join("copy.cs16");

        let written = copy_native(input.path(), &output, SourceEncoding::S16, SourceEncoding::S16).unwrap();
        assert_eq!(written, 400);
        assert_eq!(std::fs::read(&output).unwrap(), bytes);
    }

    #[test]
    fn test_copy_onto_itself_keeps_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("capture.cs8");
        let bytes: Vec<u8> = (0..64u8).collect();
        std::fs::write(&path, &bytes).unwrap();

        let written = copy_native(&path, &path, SourceEncoding::S8, SourceEncoding::S8).unwrap();
        assert_eq!(written, 64);
        assert_eq!(std::fs::read(&path).unwrap(), bytes);
    }

    #[test]
    fn test_bit_depth_conversion_is_rejected() {
        let input = write_temp(&[0u8; 8]);
        let dir = tempdir().unwrap();
        let output = dir.path().join("out.cs8");

        let result = copy_native(input.path(), &output, SourceEncoding::S16, SourceEncoding::S8);
        assert!(matches!(result, Err(FormatError::UnsupportedConversion { .. })));
        assert!(!output.exists());
    }

    #[quickcheck]
    fn prop_decoded_values_are_normalized(bytes: Vec<u8>, wide: bool) -> bool {
        let encoding = if wide { SourceEncoding::S16 } else { SourceEncoding::S8 };
        let data = decode_bytes(&bytes, encoding);
        data.len() % 2 == 0 && data.iter().all(|v| (-1.0..1.0).contains(v))
    }
}
