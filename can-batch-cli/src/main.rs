//! CAN Batch Decoder CLI Application
//!
//! Command-line front end for the can-batch-decoder library. It adds:
//! - TOML configuration with command-line overrides
//! - Reading newline-delimited JSON batches from a file or stdin
//! - Optional parallel decoding of batches
//! - JSON output, one decoded object per batch

use anyhow::{Context, Result};
use can_batch_decoder::Converter;
use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

mod config;
mod process;

use config::AppConfig;
use process::ProcessOptions;

/// CAN Batch Decoder - Decode JSON CAN frame batches with DBC definitions
#[derive(Parser, Debug)]
#[command(name = "can-batch-cli")]
#[command(about = "Decode JSON batches of CAN frames into signal values", long_about = None)]
#[command(version)]
struct Args {
    /// DBC file, or directory searched recursively for .dbc files
    #[arg(short, long, value_name = "PATH")]
    dbc: Option<PathBuf>,

    /// Newline-delimited JSON batches (default: stdin)
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output file for decoded signals (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit batch meta alongside the signals
    #[arg(long)]
    with_meta: bool,

    /// Abort on the first batch that fails to decode
    #[arg(long)]
    strict: bool,

    /// Decode batches in parallel
    #[arg(long)]
    parallel: bool,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    log::info!("CAN Batch Decoder CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", can_batch_decoder::VERSION);

    let config = resolve_config(&args)?;

    let dbc_path = config
        .input
        .dbc_path
        .clone()
        .context("No signal definitions given: use --dbc or set [input] dbc_path")?;

    let converter = Converter::with_config(&dbc_path, config.decoder.clone())
        .with_context(|| format!("Failed to load signal definitions from {:?}", dbc_path))?;

    let stats = converter.database_stats();
    log::info!(
        "Signal database: {} messages, {} signals",
        stats.num_messages,
        stats.num_signals
    );

    let batches = open_batches(&config)?;

    let mut output: Box<dyn Write> = match &config.output.path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {:?}", path))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let options = ProcessOptions {
        include_meta: config.output.include_meta,
        strict: config.output.strict,
        parallel: args.parallel,
    };
    let summary = process::process_batches(&converter, batches, options, &mut output)?;

    log::info!(
        "Done: {} batches decoded, {} failed",
        summary.decoded,
        summary.failed
    );

    Ok(())
}

/// Load the config file (if any) and apply command-line overrides
fn resolve_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };

    if let Some(dbc) = &args.dbc {
        config.input.dbc_path = Some(dbc.clone());
    }
    if let Some(input) = &args.input {
        config.input.batches = Some(input.clone());
    }
    if let Some(output) = &args.output {
        config.output.path = Some(output.clone());
    }
    config.output.include_meta |= args.with_meta;
    config.output.strict |= args.strict;

    Ok(config)
}

/// Open the batch stream: the configured file, or stdin
fn open_batches(config: &AppConfig) -> Result<Box<dyn BufRead>> {
    let reader: Box<dyn BufRead> = match &config.input.batches {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open batch file: {:?}", path))?,
        )),
        None => {
            log::debug!("Reading batches from stdin");
            Box::new(io::stdin().lock())
        }
    };

    Ok(reader)
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
