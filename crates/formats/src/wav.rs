//! WAV / RF64 IQ reader
//!
//! Only 16-bit PCM with one or two channels is accepted. Stereo files carry
//! I on the left and Q on the right channel; mono files carry an interleaved
//! I,Q stream. Both layouts are therefore decoded identically, four bytes
//! per complex sample.

use crate::{FormatError, Result};
use iqkit_core::buffer::{IqSampleBuffer, SourceEncoding};
use iqkit_core::{Complex32, CoreError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::num::NonZeroU32;
use std::path::Path;
use tracing::{debug, warn};

/// Bytes read up front to locate the `fmt ` and `data` chunks
pub const HEADER_WINDOW: usize = 4096;

/// Below this rate a WAV file is assumed to be ordinary audio
pub const IQ_MIN_SAMPLE_RATE: u32 = 100_000;

/// `WAVE_FORMAT_PCM`
pub const FORMAT_PCM: u16 = 1;

/// Complex samples decoded per read when loading a whole file
pub const DEFAULT_CHUNK_SAMPLES: usize = 1 << 16;

const BYTES_PER_FRAME: usize = 4;

/// Outer container flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerKind {
    Riff,
    Rf64,
}

impl std::fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerKind::Riff => f.write_str("RIFF"),
            ContainerKind::Rf64 => f.write_str("RF64"),
        }
    }
}

/// Parsed WAV header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WavHeader {
    pub kind: ContainerKind,
    pub format_tag: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    /// Absolute file offset of the first data byte
    pub data_offset: u64,
    /// Length of the data chunk in bytes
    pub data_len: u64,
}

struct FmtChunk {
    format_tag: u16,
    channels: u16,
    sample_rate: u32,
    byte_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
}

fn le_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn le_u64(bytes: &[u8], at: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(raw)
}

impl WavHeader {
    /// Parse the header from the leading bytes of a file
    ///
    /// Chunks are walked in file order until `data` is found. The `fmt `
    /// body and every chunk header before `data` must lie within `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 12 {
            return Err(FormatError::decode(format!(
                "truncated header: {} bytes",
                bytes.len()
            )));
        }

        let kind = match &bytes[0..4] {
            b"RIFF" => ContainerKind::Riff,
            b"RF64" => ContainerKind::Rf64,
            other => {
                return Err(FormatError::decode(format!(
                    "bad magic {:?}, expected RIFF or RF64",
                    String::from_utf8_lossy(other)
                )))
            }
        };
        if &bytes[8..12] != b"WAVE" {
            return Err(FormatError::decode("missing WAVE identifier"));
        }

        let mut fmt: Option<FmtChunk> = None;
        let mut ds64_data_len: Option<u64> = None;
        let mut pos = 12usize;

        let (data_offset, data_size) = loop {
            if pos + 8 > bytes.len() {
                return Err(FormatError::decode(format!(
                    "no data chunk within the first {} bytes",
                    bytes.len()
                )));
            }

            let id = &bytes[pos..pos + 4];
            let size = le_u32(bytes, pos + 4);
            let body = pos + 8;

            match id {
                b"fmt " => {
                    if size < 16 {
                        return Err(FormatError::decode(format!("fmt chunk too short: {} bytes", size)));
                    }
                    if body + 16 > bytes.len() {
                        return Err(FormatError::decode("fmt chunk extends past header window"));
                    }
                    fmt = Some(FmtChunk {
                        format_tag: le_u16(bytes, body),
                        channels: le_u16(bytes, body + 2),
                        sample_rate: le_u32(bytes, body + 4),
                        byte_rate: le_u32(bytes, body + 8),
                        block_align: le_u16(bytes, body + 12),
                        bits_per_sample: le_u16(bytes, body + 14),
                    });
                }
                b"ds64" if kind == ContainerKind::Rf64 => {
                    if size < 24 || body + 24 > bytes.len() {
                        return Err(FormatError::decode("truncated ds64 chunk"));
                    }
                    // riff size, then data size, then sample count
                    ds64_data_len = Some(le_u64(bytes, body + 8));
                }
                b"data" => break (body as u64, size),
                _ => {
                    debug!("Skipping chunk {:?} ({} bytes)", String::from_utf8_lossy(id), size);
                }
            }

            // Chunks are word aligned; odd sizes carry one pad byte
            let padded = size as usize + (size as usize & 1);
            pos = body
                .checked_add(padded)
                .ok_or_else(|| FormatError::decode("chunk size overflows"))?;
        };

        let fmt = fmt.ok_or_else(|| FormatError::decode("missing fmt chunk before data"))?;

        let data_len = match kind {
            ContainerKind::Riff => data_size as u64,
            ContainerKind::Rf64 => ds64_data_len
                .ok_or_else(|| FormatError::decode("RF64 file without ds64 chunk"))?,
        };

        let header = Self {
            kind,
            format_tag: fmt.format_tag,
            channels: fmt.channels,
            sample_rate: fmt.sample_rate,
            byte_rate: fmt.byte_rate,
            block_align: fmt.block_align,
            bits_per_sample: fmt.bits_per_sample,
            data_offset,
            data_len,
        };
        header.validate()?;
        debug!("Parsed WAV header: {:?}", header);
        Ok(header)
    }

    /// Enforce the accepted sample layout
    ///
    /// A non-PCM format tag only produces a warning since some IQ
    /// recorders write a wrong tag.
    fn validate(&self) -> Result<()> {
        if !self.is_pcm() {
            warn!(
                "WAV format tag is {:#06x}, not PCM; decoding as 16-bit PCM anyway",
                self.format_tag
            );
        }
        if self.bits_per_sample != 16 {
            return Err(FormatError::decode(format!(
                "unsupported bits per sample: {} (only 16 is supported)",
                self.bits_per_sample
            )));
        }
        if !(1..=2).contains(&self.channels) {
            return Err(FormatError::decode(format!(
                "unsupported channel count: {} (expected 1 or 2)",
                self.channels
            )));
        }
        if self.sample_rate == 0 {
            return Err(FormatError::decode("sample rate is zero"));
        }
        Ok(())
    }

    pub fn is_pcm(&self) -> bool {
        self.format_tag == FORMAT_PCM
    }

    /// Heuristic: PCM, 16-bit, 1-2 channels and a sample rate of at least 100 kHz
    ///
    /// Used for auto-detection only, never for validation.
    pub fn is_iq_like(&self) -> bool {
        self.is_pcm()
            && self.bits_per_sample == 16
            && (1..=2).contains(&self.channels)
            && self.sample_rate >= IQ_MIN_SAMPLE_RATE
    }

    /// Complex samples described by the data chunk
    pub fn complex_samples(&self) -> u64 {
        self.data_len / BYTES_PER_FRAME as u64
    }

    pub fn sample_rate(&self) -> Option<NonZeroU32> {
        NonZeroU32::new(self.sample_rate)
    }
}

/// Read up to `limit` bytes, stopping early at end of file
fn read_up_to<R: Read>(reader: &mut R, limit: usize) -> std::io::Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(limit);
    reader.take(limit as u64).read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Streaming reader over the data chunk of a WAV/RF64 file
#[derive(Debug)]
pub struct WavReader<R> {
    reader: R,
    header: WavHeader,
    remaining: u64,
}

impl WavReader<BufReader<File>> {
    /// Open `path` and parse its header
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(FormatError::file(path))?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> WavReader<R> {
    /// Parse the header from `reader` and position it at the first data byte
    ///
    /// The data length is clamped to the bytes actually present after the
    /// data offset, so a declared size larger than the file only loses the
    /// missing frames.
    pub fn new(mut reader: R) -> Result<Self> {
        let window = read_up_to(&mut reader, HEADER_WINDOW)?;
        let header = WavHeader::parse(&window)?;
        let file_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(header.data_offset))?;

        let present = file_len.saturating_sub(header.data_offset);
        if header.data_len > present {
            warn!(
                "Data chunk declares {} bytes but only {} follow the header",
                header.data_len, present
            );
        }

        Ok(Self {
            reader,
            remaining: header.data_len.min(present),
            header,
        })
    }

    /// Complex samples still available, bounded by the file length
    pub fn remaining_samples(&self) -> u64 {
        self.remaining / BYTES_PER_FRAME as u64
    }

    pub fn header(&self) -> &WavHeader {
        &self.header
    }

    /// Read up to `max_samples` raw (I, Q) pairs
    ///
    /// Returns `None` once the data chunk or the file is exhausted. A
    /// trailing partial pair is dropped.
    pub fn read_raw_chunk(&mut self, max_samples: usize) -> Result<Option<Vec<[i16; 2]>>> {
        let frame_bytes = BYTES_PER_FRAME as u64;
        let wanted = (max_samples as u64)
            .saturating_mul(frame_bytes)
            .min(self.remaining - self.remaining % frame_bytes);
        if wanted == 0 {
            return Ok(None);
        }

        let bytes = read_up_to(&mut self.reader, wanted as usize)?;
        if (bytes.len() as u64) < wanted {
            // File ends before the data chunk does
            self.remaining = 0;
        } else {
            self.remaining -= wanted;
        }

        let pairs: Vec<[i16; 2]> = bytes
            .chunks_exact(BYTES_PER_FRAME)
            .map(|b| {
                [
                    i16::from_le_bytes([b[0], b[1]]),
                    i16::from_le_bytes([b[2], b[3]]),
                ]
            })
            .collect();

        if pairs.is_empty() {
            Ok(None)
        } else {
            Ok(Some(pairs))
        }
    }

    /// Read up to `max_samples` complex samples normalized to [-1.0, 1.0]
    pub fn read_chunk(&mut self, max_samples: usize) -> Result<Option<Vec<Complex32>>> {
        let scale = SourceEncoding::S16.full_scale();
        Ok(self.read_raw_chunk(max_samples)?.map(|pairs| {
            pairs
                .iter()
                .map(|&[i, q]| Complex32::new(i as f32 / scale, q as f32 / scale))
                .collect()
        }))
    }

    /// Decode the remaining data into a sample buffer
    pub fn read_all(mut self) -> Result<IqSampleBuffer> {
        let expected = self.remaining / BYTES_PER_FRAME as u64 * 2;
        let mut data: Vec<f32> = Vec::new();
        data.try_reserve_exact(expected as usize)
            .map_err(|_| CoreError::AllocationFailure {
                what: "WAV sample buffer",
                bytes: (expected as usize).saturating_mul(4),
            })?;

        let scale = SourceEncoding::S16.full_scale();
        while let Some(pairs) = self.read_raw_chunk(DEFAULT_CHUNK_SAMPLES)? {
            for [i, q] in pairs {
                data.push(i as f32 / scale);
                data.push(q as f32 / scale);
            }
        }

        if (data.len() as u64) < expected {
            warn!(
                "Expected {} samples but only {} could be read",
                expected / 2,
                data.len() / 2
            );
        }

        Ok(IqSampleBuffer::from_interleaved(
            data,
            self.header.sample_rate(),
            SourceEncoding::S16,
        )?)
    }
}

/// Parse only the header of `path`
pub fn read_header<P: AsRef<Path>>(path: P) -> Result<WavHeader> {
    Ok(WavReader::open(path)?.header().clone())
}

/// Whether `path` looks like an IQ recording rather than ordinary audio
pub fn is_iq_wav<P: AsRef<Path>>(path: P) -> Result<bool> {
    Ok(read_header(path)?.is_iq_like())
}

/// Load a whole WAV/RF64 file
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<IqSampleBuffer> {
    WavReader::open(path)?.read_all()
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Hand-assembled containers for tests

    pub fn fmt_body(format_tag: u16, channels: u16, sample_rate: u32, bits: u16) -> Vec<u8> {
        let block_align = channels * bits / 8;
        let mut body = Vec::new();
        body.extend_from_slice(&format_tag.to_le_bytes());
        body.extend_from_slice(&channels.to_le_bytes());
        body.extend_from_slice(&sample_rate.to_le_bytes());
        body.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
        body.extend_from_slice(&block_align.to_le_bytes());
        body.extend_from_slice(&bits.to_le_bytes());
        body
    }

    pub fn chunk(id: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(id);
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(body);
        if body.len() % 2 == 1 {
            out.push(0);
        }
        out
    }

    pub fn pcm_payload(values: &[i16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    /// RIFF file from a list of pre-built chunks
    pub fn riff(chunks: &[Vec<u8>]) -> Vec<u8> {
        let body: Vec<u8> = chunks.concat();
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&((body.len() + 4) as u32).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(&body);
        out
    }

    /// RF64 file: ds64 first, then fmt, then a data chunk with a 0xFFFFFFFF size
    pub fn rf64(fmt: &[u8], payload: &[u8]) -> Vec<u8> {
        let mut ds64 = Vec::new();
        let riff_size = (4 + 36 + 8 + fmt.len() + 8 + payload.len()) as u64;
        ds64.extend_from_slice(&riff_size.to_le_bytes());
        ds64.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        ds64.extend_from_slice(&((payload.len() / 4) as u64).to_le_bytes());
        ds64.extend_from_slice(&0u32.to_le_bytes());

        let mut out = Vec::new();
        out.extend_from_slice(b"RF64");
        out.extend_from_slice(&u32::MAX.to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(&chunk(b"ds64", &ds64));
        out.extend_from_slice(&chunk(b"fmt ", fmt));
        out.extend_from_slice(b"data");
        out.extend_from_slice(&u32::MAX.to_le_bytes());
        out.extend_from_slice(payload);
        out
    }
}
