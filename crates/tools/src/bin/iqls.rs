//! iqls - list IQ captures with their format, rate and length

use anyhow::Result;
use clap::Parser;
use iqkit_tools::{exit_with_error, init_logging, inspect};
use std::num::NonZeroU32;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "iqls")]
#[command(about = "Show container, encoding, sample rate and duration of IQ files")]
#[command(version)]
struct Cli {
    /// Files to inspect
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Sample rate in Hz for files without one
    #[arg(long)]
    sample_rate: Option<NonZeroU32>,

    /// Print one JSON object per file
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug output
    #[arg(long)]
    debug: bool,
}

fn run(cli: &Cli) -> Result<()> {
    for path in &cli.files {
        let summary = inspect(path, cli.sample_rate)?;
        if cli.json {
            println!("{}", serde_json::to_string(&summary)?);
        } else {
            println!("{}", summary);
        }
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
