//! iqkit Tools library

pub mod common;
pub mod config;
pub mod generate;
pub mod inspect;
pub mod visualize;

pub use common::{exit_with_error, init_logging};
pub use config::{VizArgs, VizConfig};
pub use generate::{generate, SignalSpec, SignalType};
pub use inspect::{inspect, FileSummary};
pub use visualize::{visualize, Plot};
