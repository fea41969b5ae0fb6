//! Waterfall accumulation
//!
//! Every frame is kept as its own row on the display scale. The value range
//! is tracked across all rows and bins so that colors stay continuous over
//! time; rendering only starts once every row has been computed.

use crate::buffer::IqSampleBuffer;
use crate::spectrum::{DisplayScale, FrameParams, FrameProcessor, ValueRange};
use crate::{CoreError, Result};
use std::num::NonZeroU32;
use tracing::{debug, warn};

/// Waterfall geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterfallParams {
    pub frame: FrameParams,
    /// Upper bound on rows regardless of capture length
    pub max_frames: usize,
    /// Pixel rows available for the plot
    pub target_rows: usize,
}

impl WaterfallParams {
    pub fn validate(&self) -> Result<()> {
        self.frame.validate()?;
        if self.max_frames == 0 || self.target_rows == 0 {
            return Err(CoreError::InvalidParameters {
                msg: format!(
                    "waterfall needs at least one frame and one row (max_frames={}, rows={})",
                    self.max_frames, self.target_rows
                ),
            });
        }
        Ok(())
    }
}

/// Sample offsets of the windows a waterfall will use, earliest first
///
/// When more full windows exist than rows allow, windows are picked at
/// evenly spaced positions across the whole capture.
pub fn frame_offsets(available: usize, params: &WaterfallParams) -> Result<Vec<usize>> {
    params.validate()?;
    params.frame.require_one_window(available)?;

    let hop = params.frame.hop_size;
    let full = params.frame.full_windows(available);
    let count = full.min(params.max_frames).min(params.target_rows);

    if count == full {
        return Ok((0..count).map(|i| i * hop).collect());
    }
    if count == 1 {
        return Ok(vec![0]);
    }

    Ok((0..count)
        .map(|i| i * (full - 1) / (count - 1) * hop)
        .collect())
}

/// Stack of reduced spectra, index 0 being the earliest
#[derive(Debug, Clone, PartialEq)]
pub struct Waterfall {
    rows: Vec<Vec<f32>>,
    offsets: Vec<usize>,
    range: ValueRange,
    fft_size: usize,
    scale: DisplayScale,
    covered_samples: usize,
    sample_rate: Option<NonZeroU32>,
}

impl Waterfall {
    /// Number of frames (rows of spectra)
    pub fn frames(&self) -> usize {
        self.rows.len()
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn scale(&self) -> DisplayScale {
        self.scale
    }

    /// Global range across every frame and bin
    pub fn range(&self) -> ValueRange {
        self.range
    }

    pub fn row(&self, frame: usize) -> Option<&[f32]> {
        self.rows.get(frame).map(|r| r.as_slice())
    }

    /// First sample of `frame`'s window
    pub fn offset(&self, frame: usize) -> Option<usize> {
        self.offsets.get(frame).copied()
    }

    /// Value at (`bin`, `frame`) normalized against the global range
    pub fn normalized(&self, bin: usize, frame: usize) -> f32 {
        self.rows
            .get(frame)
            .and_then(|r| r.get(bin))
            .map_or(0.0, |&v| self.range.normalize(v))
    }

    /// Samples spanned from the first window start to the last window end
    pub fn covered_samples(&self) -> usize {
        self.covered_samples
    }

    pub fn sample_rate(&self) -> Option<NonZeroU32> {
        self.sample_rate
    }

    /// Elapsed time at the most recent frame, when the rate is known
    pub fn duration_secs(&self) -> Option<f64> {
        self.sample_rate
            .map(|rate| self.covered_samples as f64 / rate.get() as f64)
    }
}

/// Compute one reduced spectrum per selected window
pub fn compute_waterfall(samples: &IqSampleBuffer, params: &WaterfallParams) -> Result<Waterfall> {
    let offsets = frame_offsets(samples.len(), params)?;
    let mut processor = FrameProcessor::new(params.frame)?;
    let scale = params.frame.scale;

    let mut rows = Vec::with_capacity(offsets.len());
    let mut kept_offsets = Vec::with_capacity(offsets.len());
    let mut range = ValueRange::empty();
    let mut skipped = 0;

    for (index, &offset) in offsets.iter().enumerate() {
        let frame = match processor.frame_at(samples, index, offset) {
            Ok(frame) => frame,
            Err(CoreError::CorruptFrame { index }) => {
                warn!("Skipping waterfall frame {} with non-finite power", index);
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        let row: Vec<f32> = frame
            .power
            .iter()
            .map(|&p| {
                let value = scale.reduce(p);
                range.include(value);
                value
            })
            .collect();
        rows.push(row);
        kept_offsets.push(offset);
    }

    if rows.is_empty() {
        return Err(CoreError::NoUsableFrames { skipped });
    }

    let covered_samples = kept_offsets
        .last()
        .map_or(0, |&last| (last + params.frame.fft_size).min(samples.len()));

    debug!(
        "Waterfall of {} frame(s) x {} bins ({} skipped), range {:.2}..{:.2}",
        rows.len(),
        params.frame.fft_size,
        skipped,
        range.min,
        range.max
    );

    Ok(Waterfall {
        rows,
        offsets: kept_offsets,
        range,
        fft_size: params.frame.fft_size,
        scale,
        covered_samples,
        sample_rate: samples.sample_rate(),
    })
}
