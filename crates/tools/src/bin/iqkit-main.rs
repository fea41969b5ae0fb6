//! iqkit - Unified IQ capture tool
//!
//! Inspects, converts, visualizes and generates IQ captures.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use iqkit_formats::convert::convert;
use iqkit_formats::ContainerFormat;
use iqkit_tools::generate::{generate, SignalSpec, SignalType};
use iqkit_tools::visualize::{load_capture, write_plot, Plot};
use iqkit_tools::{exit_with_error, init_logging, inspect, VizArgs, VizConfig};
use std::num::NonZeroU32;
use std::path::PathBuf;
use tracing::info;

/// iqkit unified IQ tool
#[derive(Parser)]
#[command(name = "iqkit")]
#[command(about = "IQ capture inspection, conversion and visualization")]
#[command(version)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show format, rate and length of captures
    Info(InfoConfig),
    /// Convert between containers
    Convert(ConvertConfig),
    /// Render <prefix>_spectrum.png
    Spectrum(PlotConfig),
    /// Render <prefix>_waterfall.png
    Waterfall(PlotConfig),
    /// Render both plots
    Viz(PlotConfig),
    /// Generate test signals
    Generate(GenerateConfig),
    /// Write the default visualization settings as TOML
    Config(WriteConfig),
}

#[derive(Args)]
struct InfoConfig {
    /// Files to inspect
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Sample rate in Hz for files without one
    #[arg(long)]
    sample_rate: Option<NonZeroU32>,
}

#[derive(Args)]
struct ConvertConfig {
    /// Input file
    input: PathBuf,

    /// Output file
    output: PathBuf,

    /// Output format (wav, s8, s16)
    #[arg(long)]
    to: ContainerFormat,

    /// Input format, skipping detection
    #[arg(long)]
    from: Option<ContainerFormat>,

    /// Sample rate in Hz, needed when writing WAV from a native file
    #[arg(long)]
    sample_rate: Option<NonZeroU32>,
}

#[derive(Args)]
struct PlotConfig {
    /// Input capture
    input: PathBuf,

    /// Output path prefix
    #[arg(short, long)]
    prefix: PathBuf,

    /// Input format, skipping detection
    #[arg(long)]
    format: Option<ContainerFormat>,

    #[command(flatten)]
    viz: VizArgs,
}

#[derive(Args)]
struct GenerateConfig {
    /// Output file
    #[arg(short, long)]
    output: PathBuf,

    /// Output format; taken from the output extension if omitted
    #[arg(long)]
    format: Option<ContainerFormat>,

    /// Signal type
    #[arg(short, long, value_enum, default_value = "tone")]
    signal: SignalType,

    /// Sample rate in Hz
    #[arg(long, default_value = "1000000")]
    sample_rate: NonZeroU32,

    /// Frequency offset in Hz (sweep start)
    #[arg(short, long, default_value = "100000", allow_negative_numbers = true)]
    frequency: f64,

    /// Sweep end frequency offset in Hz
    #[arg(long, default_value = "-100000", allow_negative_numbers = true)]
    end_frequency: f64,

    /// Duration in seconds
    #[arg(short, long, default_value = "1.0")]
    duration: f64,

    /// Amplitude (0.0 to 1.0]
    #[arg(short, long, default_value = "0.5")]
    amplitude: f64,
}

#[derive(Args)]
struct WriteConfig {
    /// Destination TOML file
    output: PathBuf,
}

fn plot(config: &PlotConfig, plots: &[Plot]) -> Result<()> {
    let viz = config.viz.resolve()?;
    let samples = load_capture(&config.input, config.format, &viz)?;
    for &p in plots {
        let path = write_plot(&samples, &viz, p, &config.prefix)?;
        println!("{}", path.display());
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    info!("iqkit starting");

    match cli.command {
        Commands::Info(config) => {
            for path in &config.files {
                println!("{}", inspect(path, config.sample_rate)?);
            }
        }

        Commands::Convert(config) => {
            let report = convert(&config.input, &config.output, config.from, config.to, config.sample_rate)?;
            println!(
                "Converted {} ({}) to {} ({}): {} samples",
                config.input.display(),
                report.from,
                config.output.display(),
                report.to,
                report.samples
            );
        }

        Commands::Spectrum(config) => plot(&config, &[Plot::Spectrum])?,
        Commands::Waterfall(config) => plot(&config, &[Plot::Waterfall])?,
        Commands::Viz(config) => plot(&config, &Plot::ALL)?,

        Commands::Generate(config) => {
            let format = match config.format {
                Some(f) => f,
                None => ContainerFormat::from_extension(&config.output)?
                    .context("Cannot tell the output format from its extension; pass --format")?,
            };
            let spec = SignalSpec {
                signal: config.signal,
                sample_rate: config.sample_rate,
                frequency: config.frequency,
                end_frequency: config.end_frequency,
                duration: config.duration,
                amplitude: config.amplitude,
            };
            let samples = generate(&config.output, format, &spec)?;
            println!("Generated {} samples in {}", samples, config.output.display());
        }

        Commands::Config(config) => {
            VizConfig::default().save_to_file(&config.output)?;
            println!("Default settings written to {}", config.output.display());
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.debug);

    if let Err(e) = run(cli) {
        exit_with_error(e);
    }
}
