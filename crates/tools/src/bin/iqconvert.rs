//! iqconvert - convert IQ captures between containers

use anyhow::{Context, Result};
use clap::Parser;
use iqkit_formats::convert::convert;
use iqkit_formats::ContainerFormat;
use iqkit_tools::{exit_with_error, init_logging};
use std::num::NonZeroU32;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "iqconvert")]
#[command(about = "Convert IQ files between WAV and native s8/s16 without rescaling")]
#[command(version)]
struct Cli {
    /// Input file
    input: PathBuf,

    /// Output file
    output: PathBuf,

    /// Output format (wav, s8, s16); taken from the output extension if omitted
    #[arg(long)]
    to: Option<ContainerFormat>,

    /// Input format, skipping detection
    #[arg(long)]
    from: Option<ContainerFormat>,

    /// Sample rate in Hz, needed when writing WAV from a native file
    #[arg(long)]
    sample_rate: Option<NonZeroU32>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug output
    #[arg(long)]
    debug: bool,
}

fn run(cli: &Cli) -> Result<()> {
    let to = match cli.to {
        Some(to) => to,
        None => ContainerFormat::from_extension(&cli.output)?
            .context("Cannot tell the output format from its extension; pass --to")?,
    };
    let report = convert(&cli.input, &cli.output, cli.from, to, cli.sample_rate)?;
    println!(
        "{} ({}) -> {} ({}): {} samples",
        cli.input.display(),
        report.from,
        cli.output.display(),
        report.to,
        report.samples
    );
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.debug);

    if let Err(e) = run(&cli) {
        exit_with_error(e);
    }
}
