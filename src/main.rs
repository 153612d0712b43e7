//! ukaccounts CLI - UK company accounts to CSV

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use colored::*;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use ukaccounts::{Extractor, ExtractorConfig, OutputFormat, RunSummary};

/// Extract UK GAAP figures from inline XBRL and legacy XBRL accounts
#[derive(ClapParser)]
#[command(name = "ukaccounts")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Filings or directories of filings (directories are not recursed).
    /// With none, every subdirectory of --data-root is processed.
    paths: Vec<PathBuf>,

    /// Root scanned when no paths are given
    #[arg(long, default_value = "data")]
    data_root: PathBuf,

    /// Write rows to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Log every filing loaded
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let config = ExtractorConfig::default()
        .with_format(cli.format)
        .with_data_root(cli.data_root);

    let start = Instant::now();
    let mut extractor = Extractor::new(out, config).context("Failed to start output")?;
    let outcome = extractor.run(&cli.paths);
    let (summary, _) = extractor.finish().context("Failed to flush output")?;
    outcome.context("Batch aborted")?;

    report(&summary, start.elapsed().as_secs_f64());
    Ok(())
}

fn init_tracing(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "info" })
    });

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn report(summary: &RunSummary, secs: f64) {
    let mark = if summary.failed == 0 {
        "✓".green().bold()
    } else {
        "!".yellow().bold()
    };
    eprintln!(
        "{} {} filings extracted, {} failed ({:.2}s)",
        mark,
        summary.written,
        if summary.failed == 0 {
            summary.failed.to_string().normal()
        } else {
            summary.failed.to_string().red()
        },
        secs
    );
}
