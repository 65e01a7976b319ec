//! Replay an MBO CSV file into MBP-10 snapshots.
//!
//! # Usage
//!
//! ```bash
//! # Replay, skipping malformed records
//! cargo run --release --bin lob_replay -- data/mbo.csv output.csv
//!
//! # Stop at the first malformed record and export diagnostics
//! cargo run --release --bin lob_replay -- data/mbo.csv output.csv \
//!     --strict --warnings warnings.json
//! ```
//!
//! Set `RUST_LOG=debug` to log every ignored event.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use lob_replay::{
    BookConfig, CsvSource, EventSource, Mbp10Writer, ReplayConfig, ReplaySummary, Replayer,
    Result, TOP_LEVELS,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "lob_replay")]
#[command(about = "Rebuild a limit order book from MBO events and write MBP-10 snapshots")]
struct Args {
    /// Input MBO CSV file
    input: PathBuf,

    /// Output MBP-10 CSV file
    output: PathBuf,

    /// Snapshot depth used for change detection (1-10)
    #[arg(long, default_value_t = TOP_LEVELS, value_parser = parse_levels)]
    levels: usize,

    /// Fail on the first malformed record instead of skipping it
    #[arg(long)]
    strict: bool,

    /// Write a JSON warnings report to this path
    #[arg(long, value_name = "PATH")]
    warnings: Option<PathBuf>,
}

fn parse_levels(text: &str) -> std::result::Result<usize, String> {
    let levels: usize = text
        .parse()
        .map_err(|_| format!("`{text}` is not a number"))?;
    if (1..=TOP_LEVELS).contains(&levels) {
        Ok(levels)
    } else {
        Err(format!("levels must be between 1 and {TOP_LEVELS}"))
    }
}

fn replay(args: &Args, replayer: &mut Replayer) -> Result<ReplaySummary> {
    let source = CsvSource::from_path(&args.input)?.skip_invalid(!args.strict);
    if let Some(symbol) = &source.metadata().symbol {
        log::info!("Symbol: {symbol}");
    }

    let output = File::create(&args.output)?;
    let mut writer = Mbp10Writer::new(BufWriter::new(output));

    let summary = replayer.run(source, &mut writer)?;
    writer.into_inner()?.flush()?;
    Ok(summary)
}

fn export_warnings(args: &Args, replayer: &Replayer) -> Result<()> {
    if let Some(path) = &args.warnings {
        replayer.warnings().export_json(path)?;
        log::info!(
            "Wrote {} warnings to {}",
            replayer.warnings().len(),
            path.display()
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();

    let config = ReplayConfig::new().with_book(BookConfig::new(args.levels));
    let mut replayer = Replayer::with_config(config);

    let result = replay(&args, &mut replayer);

    if let Err(e) = export_warnings(&args, &replayer) {
        log::error!("Failed to export warnings: {e}");
    }

    match result {
        Ok(summary) => {
            println!("Summary:");
            println!("  Events:      {}", summary.stats.events);
            println!("  Rows:        {}", summary.stats.rows_emitted);
            println!("  Ignored:     {}", summary.stats.ignored);
            println!("  Resets:      {}", summary.stats.resets);
            println!("  Skipped:     {}", summary.stats.records_skipped);
            println!("  Live orders: {}", summary.book.active_orders);
            println!("  Elapsed:     {:.2}s", summary.elapsed_secs);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
