//! iqkit Formats - IQ container decoders
//!
//! This crate turns WAV/RF64 and headerless native (`s8`/`s16`) IQ files
//! into [`iqkit_core::buffer::IqSampleBuffer`]s and converts between
//! containers without changing sample depth.

pub mod wav;
pub mod native;
pub mod container;
pub mod convert;
pub mod error;
mod staging;

pub use container::{load, ContainerFormat};
pub use error::{FormatError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        container::{load, ContainerFormat},
        convert::{convert, ConversionReport},
        native::{classify_len, read_native},
        wav::{is_iq_wav, read_wav, ContainerKind, WavHeader, WavReader},
        error::{FormatError, Result},
    };
}
