//! iqkit Render - color mapping and plot output
//!
//! Turns spectra and waterfalls from `iqkit-core` into RGB images with
//! calibrated frequency, level and time axes, and writes them as PNG.

pub mod axis;
pub mod colormap;
pub mod font;
pub mod image;
pub mod plot;
pub mod error;

pub use error::{RenderError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        axis::{frequency_at, AxisSpec, LinearAxis, UnitScale},
        colormap::color_for,
        image::RenderImage,
        plot::{render_spectrum, render_waterfall, PlotLayout},
        error::{RenderError, Result},
    };
}
