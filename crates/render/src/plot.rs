//! Spectrum and waterfall plot composition
//!
//! Both plots share the same frame: a graph area to the right of a label
//! margin, frequency along the bottom and either level (spectrum) or time
//! (waterfall) up the left side.

use crate::axis::{AxisSpec, LinearAxis, UnitScale};
use crate::colormap::color_for;
use crate::font::{draw_text, text_width, GLYPH_HEIGHT};
use crate::image::RenderImage;
use crate::{RenderError, Result};
use iqkit_core::spectrum::Spectrum;
use iqkit_core::waterfall::Waterfall;
use iqkit_core::CoreError;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::ops::Range;
use tracing::debug;

pub const BACKGROUND: [u8; 3] = [0, 0, 0];
pub const AXIS_COLOR: [u8; 3] = [190, 190, 190];
pub const GRID_COLOR: [u8; 3] = [40, 40, 52];
pub const LABEL_COLOR: [u8; 3] = [220, 220, 220];

const TICK_LEN: usize = 3;
const LABEL_GAP: usize = 2;

/// Image size and the margins around the graph area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotLayout {
    pub width: usize,
    pub height: usize,
    pub left_margin: usize,
    pub bottom_margin: usize,
    pub top_margin: usize,
}

impl PlotLayout {
    pub const LEFT_MARGIN: usize = 64;
    pub const BOTTOM_MARGIN: usize = 24;
    pub const TOP_MARGIN: usize = 8;
    /// Smallest graph area, in pixels on each side
    pub const MIN_GRAPH: usize = 16;

    /// Layout with the default margins
    pub fn new(width: usize, height: usize) -> Result<Self> {
        let layout = Self {
            width,
            height,
            left_margin: Self::LEFT_MARGIN,
            bottom_margin: Self::BOTTOM_MARGIN,
            top_margin: Self::TOP_MARGIN,
        };
        layout.validate()?;
        Ok(layout)
    }

    pub fn validate(&self) -> Result<()> {
        let min_width = self.left_margin + Self::MIN_GRAPH;
        let min_height = self.top_margin + self.bottom_margin + Self::MIN_GRAPH;
        if self.width < min_width || self.height < min_height {
            return Err(RenderError::InvalidDimensions {
                width: self.width,
                height: self.height,
                msg: format!("plot needs at least {}x{} to fit its axis margins", min_width, min_height),
            });
        }
        Ok(())
    }

    pub fn graph_left(&self) -> usize {
        self.left_margin
    }

    pub fn graph_top(&self) -> usize {
        self.top_margin
    }

    /// Image width minus the left-hand margin
    pub fn graph_width(&self) -> usize {
        self.width - self.left_margin
    }

    pub fn graph_height(&self) -> usize {
        self.height - self.top_margin - self.bottom_margin
    }

    /// Last pixel row of the graph area
    pub fn graph_bottom(&self) -> usize {
        self.top_margin + self.graph_height() - 1
    }
}

/// Bins drawn in graph column `x`
///
/// Columns never come out empty: with fewer bins than columns, neighboring
/// columns repeat a bin.
pub fn column_bins(x: usize, columns: usize, bins: usize) -> Range<usize> {
    if columns == 0 || bins == 0 {
        return 0..0;
    }
    let start = x * bins / columns;
    let end = ((x + 1) * bins / columns).max(start + 1).min(bins);
    start..end
}

fn column_value<F: Fn(usize) -> f32>(bins: Range<usize>, value: F) -> f32 {
    bins.map(value).fold(0.0, f32::max)
}

/// Render an averaged spectrum as filled columns
///
/// Each column rises to the largest normalized value among its bins and is
/// shaded by height with the palette.
pub fn render_spectrum(spectrum: &Spectrum, layout: &PlotLayout, axes: &AxisSpec) -> Result<RenderImage> {
    layout.validate()?;
    let mut image = RenderImage::new(layout.width, layout.height)?;
    image.fill(BACKGROUND);

    let (gw, gh) = (layout.graph_width(), layout.graph_height());
    let bins = spectrum.len();

    let range = spectrum.range();
    let level_axis = LinearAxis::new(range.max as f64, range.min as f64, gh);
    let level_unit = UnitScale::new(1.0, spectrum.scale().unit());
    let (freq_axis, freq_unit) = axes.frequency_axis(bins, gw);

    draw_vertical_axis(&mut image, layout, &level_axis, layout.graph_top(), &level_unit, true);
    draw_horizontal_axis(&mut image, layout, &freq_axis, &freq_unit, true);

    let bottom = layout.graph_bottom();
    let shade = (gh - 1).max(1) as f32;
    for x in 0..gw {
        let v = column_value(column_bins(x, gw, bins), |b| spectrum.normalized(b));
        let bar = ((v * gh as f32).round() as usize).min(gh);
        for dy in 0..bar {
            image.set_pixel(layout.graph_left() + x, bottom - dy, color_for(dy as f32 / shade));
        }
    }

    draw_frame(&mut image, layout);
    debug!(
        "Rendered spectrum: {} bins over {} columns, {:.2}..{:.2} {}",
        bins,
        gw,
        range.min,
        range.max,
        level_unit.suffix
    );
    Ok(image)
}

/// Render a waterfall with the earliest frame at the bottom
///
/// Every frame gets `graph_height / frames` rows (at least one). With more
/// frames than rows, frames are picked evenly across the capture.
pub fn render_waterfall(waterfall: &Waterfall, layout: &PlotLayout, axes: &AxisSpec) -> Result<RenderImage> {
    layout.validate()?;
    let frames = waterfall.frames();
    if frames == 0 {
        return Err(CoreError::NoUsableFrames { skipped: 0 }.into());
    }

    let mut image = RenderImage::new(layout.width, layout.height)?;
    image.fill(BACKGROUND);

    let (gw, gh) = (layout.graph_width(), layout.graph_height());
    let bins = waterfall.fft_size();
    let slots = frames.min(gh);
    let rows_per_slot = (gh / slots).max(1);
    let used = slots * rows_per_slot;
    let bottom = layout.graph_bottom();
    let used_top = bottom + 1 - used;

    let columns: Vec<Range<usize>> = (0..gw).map(|x| column_bins(x, gw, bins)).collect();
    for slot in 0..slots {
        let frame = if slots == frames {
            slot
        } else {
            slot * (frames - 1) / (slots - 1)
        };
        let lowest_row = bottom - slot * rows_per_slot;

        for (x, column) in columns.iter().enumerate() {
            let rgb = color_for(column_value(column.clone(), |b| waterfall.normalized(b, frame)));
            for r in 0..rows_per_slot {
                image.set_pixel(layout.graph_left() + x, lowest_row - r, rgb);
            }
        }
    }

    // A rate carried by the capture calibrates both axes
    let axes = AxisSpec {
        sample_rate: axes.sample_rate.or(waterfall.sample_rate()),
        ..*axes
    };
    let (time_axis, time_unit) = time_axis(waterfall, axes.sample_rate, used);
    let (freq_axis, freq_unit) = axes.frequency_axis(bins, gw);

    draw_vertical_axis(&mut image, layout, &time_axis, used_top, &time_unit, false);
    draw_horizontal_axis(&mut image, layout, &freq_axis, &freq_unit, false);
    draw_frame(&mut image, layout);

    debug!(
        "Rendered waterfall: {} of {} frames, {} row(s) each, {} columns",
        slots, frames, rows_per_slot, gw
    );
    Ok(image)
}

/// Elapsed time from the top row down to 0, or frame counts without a rate
fn time_axis(waterfall: &Waterfall, rate: Option<NonZeroU32>, rows: usize) -> (LinearAxis, UnitScale) {
    match rate {
        Some(rate) => {
            let duration = waterfall.covered_samples() as f64 / rate.get() as f64;
            (LinearAxis::new(duration, 0.0, rows), UnitScale::time(duration))
        }
        None => (
            LinearAxis::new(waterfall.frames() as f64, 0.0, rows),
            UnitScale::new(1.0, "frame"),
        ),
    }
}

/// Tick offsets and label text for a vertical axis
fn vertical_labels(axis: &LinearAxis, unit: &UnitScale) -> Vec<(usize, String)> {
    let target = (axis.pixels / 40).max(2);
    let step = axis.step(target);
    axis.ticks(target)
        .into_iter()
        .map(|tick| (tick.pixel, unit.format(tick.value, step)))
        .collect()
}

fn draw_frame(image: &mut RenderImage, layout: &PlotLayout) {
    let axis_x = layout.graph_left().saturating_sub(1);
    let axis_y = layout.graph_bottom() + 1;
    image.vline(axis_x, layout.graph_top(), axis_y, AXIS_COLOR);
    image.hline(axis_x, layout.width - 1, axis_y, AXIS_COLOR);
}

fn draw_horizontal_axis(
    image: &mut RenderImage,
    layout: &PlotLayout,
    axis: &LinearAxis,
    unit: &UnitScale,
    grid: bool,
) {
    let axis_y = layout.graph_bottom() + 1;
    let label_y = axis_y + TICK_LEN + LABEL_GAP;
    let target = (layout.graph_width() / 100).max(2);
    let step = axis.step(target);
    let mut last_end = 0;

    for tick in axis.ticks(target) {
        let x = layout.graph_left() + tick.pixel;
        if grid {
            image.vline(x, layout.graph_top(), layout.graph_bottom(), GRID_COLOR);
        }
        image.vline(x, axis_y, axis_y + TICK_LEN, AXIS_COLOR);

        let label = unit.format(tick.value, step);
        let tw = text_width(&label);
        let lx = x.saturating_sub(tw / 2).min(layout.width.saturating_sub(tw));
        if last_end == 0 || lx > last_end + LABEL_GAP * 2 {
            draw_text(image, lx, label_y, &label, LABEL_COLOR);
            last_end = lx + tw;
        }
    }

    let tw = text_width(unit.suffix);
    draw_text(
        image,
        layout.width.saturating_sub(tw + 1),
        label_y + GLYPH_HEIGHT + LABEL_GAP,
        unit.suffix,
        LABEL_COLOR,
    );
}

fn draw_vertical_axis(
    image: &mut RenderImage,
    layout: &PlotLayout,
    axis: &LinearAxis,
    origin_y: usize,
    unit: &UnitScale,
    grid: bool,
) {
    let axis_x = layout.graph_left().saturating_sub(1);

    for (pixel, label) in vertical_labels(axis, unit) {
        let y = origin_y + pixel;
        if grid {
            image.hline(layout.graph_left(), layout.width - 1, y, GRID_COLOR);
        }
        image.hline(axis_x.saturating_sub(TICK_LEN), axis_x, y, AXIS_COLOR);

        let right = axis_x.saturating_sub(TICK_LEN + LABEL_GAP);
        let ly = y
            .saturating_sub(GLYPH_HEIGHT / 2)
            .min(layout.height.saturating_sub(GLYPH_HEIGHT));
        draw_text(image, right.saturating_sub(text_width(&label)), ly, &label, LABEL_COLOR);
    }

    draw_text(
        image,
        LABEL_GAP,
        layout.graph_bottom() + 1 + TICK_LEN + LABEL_GAP,
        unit.suffix,
        LABEL_COLOR,
    );
}
