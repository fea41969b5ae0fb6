//! Axis calibration: pixel/value mapping, tick placement and label units

use std::num::NonZeroU32;

/// Frequency at a horizontal graph pixel
///
/// `pixel` counts from the left edge of the graph area; the graph center
/// maps to `center_freq` and each pixel spans `sample_rate / graph_width` Hz.
pub fn frequency_at(center_freq: f64, sample_rate: f64, graph_width: usize, pixel: f64) -> f64 {
    center_freq + (pixel - graph_width as f64 / 2.0) * (sample_rate / graph_width as f64)
}

/// Round `raw` up to 1, 2 or 5 times a power of ten
pub fn nice_step(raw: f64) -> f64 {
    if !(raw > 0.0) || !raw.is_finite() {
        return 1.0;
    }
    let magnitude = 10f64.powi(raw.log10().floor() as i32);
    let norm = raw / magnitude;
    let nice = if norm <= 1.0 {
        1.0
    } else if norm <= 2.0 {
        2.0
    } else if norm <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

/// Label unit and the divisor that converts raw values into it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitScale {
    pub divisor: f64,
    pub suffix: &'static str,
}

impl UnitScale {
    pub const fn new(divisor: f64, suffix: &'static str) -> Self {
        Self { divisor, suffix }
    }

    /// Hz, kHz, MHz or GHz depending on the largest magnitude on the axis
    pub fn frequency(max_abs_hz: f64) -> Self {
        let m = max_abs_hz.abs();
        if m >= 1e9 {
            Self::new(1e9, "GHz")
        } else if m >= 1e6 {
            Self::new(1e6, "MHz")
        } else if m >= 1e3 {
            Self::new(1e3, "kHz")
        } else {
            Self::new(1.0, "Hz")
        }
    }

    /// s, ms or us depending on the longest time on the axis
    pub fn time(max_secs: f64) -> Self {
        let m = max_secs.abs();
        if m >= 1.0 {
            Self::new(1.0, "s")
        } else if m >= 1e-3 {
            Self::new(1e-3, "ms")
        } else {
            Self::new(1e-6, "us")
        }
    }

    /// Format `value` with just enough decimals to tell `step`-spaced ticks apart
    pub fn format(&self, value: f64, step: f64) -> String {
        let scaled_step = step / self.divisor;
        let decimals = if scaled_step >= 1.0 {
            0
        } else {
            (-scaled_step.log10() - 1e-9).ceil().clamp(0.0, 6.0) as usize
        };
        let v = value / self.divisor;
        // Avoid "-0.0"
        let v = if v.abs() < scaled_step * 1e-6 { 0.0 } else { v };
        format!("{:.*}", decimals, v)
    }
}

/// A tick position on an axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub value: f64,
    /// Offset from the axis origin, in `0..pixels`
    pub pixel: usize,
}

/// Linear mapping between `pixels` screen positions and a value range
///
/// `start` sits at pixel 0 and `end` at pixel `pixels`; the range may
/// run backwards, as on the time and level axes where the top is pixel 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearAxis {
    pub start: f64,
    pub end: f64,
    pub pixels: usize,
}

impl LinearAxis {
    pub fn new(start: f64, end: f64, pixels: usize) -> Self {
        Self { start, end, pixels }
    }

    pub fn value_at(&self, pixel: f64) -> f64 {
        if self.pixels == 0 {
            return self.start;
        }
        self.start + (self.end - self.start) * pixel / self.pixels as f64
    }

    /// Pixel of `value`, clamped to the axis
    pub fn pixel_of(&self, value: f64) -> usize {
        let span = self.end - self.start;
        if self.pixels == 0 || span == 0.0 || !span.is_finite() {
            return 0;
        }
        let p = ((value - self.start) / span * self.pixels as f64).round();
        (p.max(0.0) as usize).min(self.pixels - 1)
    }

    /// Spacing chosen for roughly `target` ticks
    pub fn step(&self, target: usize) -> f64 {
        nice_step((self.end - self.start).abs() / target.max(1) as f64)
    }

    /// Ticks at multiples of [`step`](Self::step) inside the range
    pub fn ticks(&self, target: usize) -> Vec<Tick> {
        let (lo, hi) = if self.start <= self.end {
            (self.start, self.end)
        } else {
            (self.end, self.start)
        };
        if !(hi > lo) || !(hi - lo).is_finite() || self.pixels == 0 {
            return vec![Tick {
                value: self.start,
                pixel: 0,
            }];
        }

        let step = self.step(target);
        let first = (lo / step).ceil() as i64;
        let last = (hi / step).floor() as i64;
        (first..=last)
            .map(|k| {
                let value = k as f64 * step;
                Tick {
                    value,
                    pixel: self.pixel_of(value),
                }
            })
            .collect()
    }
}

/// What the horizontal axis is calibrated against
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisSpec {
    /// Tuned center frequency in Hz
    pub center_freq: f64,
    /// Without a rate the frequency axis is labelled in FFT bins and the
    /// waterfall time axis in frames
    pub sample_rate: Option<NonZeroU32>,
}

impl AxisSpec {
    pub fn new(center_freq: f64, sample_rate: Option<NonZeroU32>) -> Self {
        Self {
            center_freq,
            sample_rate,
        }
    }

    /// Horizontal axis for `bins` shifted FFT bins spread over `graph_width` pixels
    pub fn frequency_axis(&self, bins: usize, graph_width: usize) -> (LinearAxis, UnitScale) {
        match self.sample_rate {
            Some(rate) => {
                let fs = rate.get() as f64;
                let lo = frequency_at(self.center_freq, fs, graph_width, 0.0);
                let hi = frequency_at(self.center_freq, fs, graph_width, graph_width as f64);
                (
                    LinearAxis::new(lo, hi, graph_width),
                    UnitScale::frequency(lo.abs().max(hi.abs())),
                )
            }
            None => {
                let half = (bins / 2) as f64;
                (
                    LinearAxis::new(-half, bins as f64 - half, graph_width),
                    UnitScale::new(1.0, "bin"),
                )
            }
        }
    }
}
