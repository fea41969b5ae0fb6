//! Shared CLI plumbing: logging setup, error reporting and argument enums

use clap::ValueEnum;
use iqkit_core::fft::window::WindowKind;
use iqkit_core::spectrum::DisplayScale;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Install the stderr log subscriber
///
/// `--debug` wins over `--verbose`; without either only warnings show.
pub fn init_logging(verbose: bool, debug: bool) {
    let log_level = if debug {
        tracing::Level::DEBUG
    } else if verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Print the error chain on one line and exit with status 1
pub fn exit_with_error(err: anyhow::Error) -> ! {
    eprintln!("error: {:#}", err);
    std::process::exit(1)
}

/// `<prefix>_<kind>.png`
pub fn artifact_path(prefix: &Path, kind: &str) -> PathBuf {
    let mut name = prefix.as_os_str().to_owned();
    name.push(format!("_{}.png", kind));
    PathBuf::from(name)
}

/// Display scale as accepted on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleArg {
    Logmag,
    Linear,
}

impl From<ScaleArg> for DisplayScale {
    fn from(arg: ScaleArg) -> Self {
        match arg {
            ScaleArg::Logmag => DisplayScale::LogMag,
            ScaleArg::Linear => DisplayScale::Linear,
        }
    }
}

/// Window function as accepted on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowArg {
    Rectangular,
    Hann,
    Blackman,
}

impl From<WindowArg> for WindowKind {
    fn from(arg: WindowArg) -> Self {
        match arg {
            WindowArg::Rectangular => WindowKind::Rectangular,
            WindowArg::Hann => WindowKind::Hann,
            WindowArg::Blackman => WindowKind::Blackman,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_path() {
        assert_eq!(
            artifact_path(Path::new("out/capture"), "spectrum"),
            PathBuf::from("out/capture_spectrum.png")
        );
        assert_eq!(
            artifact_path(Path::new("run.1"), "waterfall"),
            PathBuf::from("run.1_waterfall.png")
        );
    }

    #[test]
    fn test_arg_conversions() {
        assert_eq!(DisplayScale::from(ScaleArg::Linear), DisplayScale::Linear);
        assert_eq!(WindowKind::from(WindowArg::Hann), WindowKind::Hann);
    }
}
