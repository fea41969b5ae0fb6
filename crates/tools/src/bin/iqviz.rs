//! iqviz - render spectrum and waterfall PNGs from an IQ capture

use anyhow::Result;
use clap::Parser;
use iqkit_formats::ContainerFormat;
use iqkit_tools::{exit_with_error, init_logging, visualize, Plot, VizArgs};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "iqviz")]
#[command(about = "Render <prefix>_spectrum.png and <prefix>_waterfall.png from an IQ file")]
#[command(version)]
struct Cli {
    /// Input capture
    input: PathBuf,

    /// Output path prefix
    #[arg(short, long)]
    prefix: PathBuf,

    /// Input format, skipping detection
    #[arg(long)]
    format: Option<ContainerFormat>,

    /// Render only this plot
    #[arg(long, value_enum)]
    only: Option<Plot>,

    #[command(flatten)]
    viz: VizArgs,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug output
    #[arg(long)]
    debug: bool,
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.viz.resolve()?;
    let plots = match cli.only {
        Some(plot) => vec![plot],
        None => Plot::ALL.to_vec(),
    };
    for path in visualize(&cli.input, cli.format, &cli.prefix, &config, &plots)? {
        println!("{}", path.display());
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.debug);

    if let Err(e) = run(&cli) {
        exit_with_error(e);
    }
}
