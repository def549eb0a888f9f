//! segmentlog CLI
//!
//! Operator tool for inspecting and editing a log directory.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use segmentlog::{Config, Log, LogRecord};
use tracing_subscriber::{fmt, EnvFilter};

/// segmentlog CLI
#[derive(Parser, Debug)]
#[command(name = "segmentlog")]
#[command(about = "Segmented append-only commit log")]
#[command(version)]
struct Args {
    /// Log directory
    #[arg(short, long, default_value = "./segmentlog_data")]
    dir: PathBuf,

    /// Store size (bytes) that triggers segment rotation
    #[arg(long, default_value = "1024")]
    max_store_bytes: u64,

    /// Index size (bytes) that triggers segment rotation
    #[arg(long, default_value = "1024")]
    max_index_bytes: u64,

    /// First offset of a brand-new log
    #[arg(long, default_value = "0")]
    initial_offset: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append one record per value
    Append {
        /// Values to append
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Print the record at an offset
    Read {
        /// The offset to read
        offset: u64,
    },

    /// Show offset range and segments
    Info,

    /// Remove every segment whose records lie at or below an offset
    Truncate {
        /// Retention cutoff
        offset: u64,
    },

    /// Write the raw bytes of every store (snapshot)
    Dump {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn main() {
    // Initialize tracing/logging; stdout is reserved for command output
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,segmentlog=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    tracing::info!("segmentlog v{}", segmentlog::VERSION);
    tracing::info!("Log directory: {}", args.dir.display());

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> segmentlog::Result<()> {
    let config = Config::builder()
        .max_store_bytes(args.max_store_bytes)
        .max_index_bytes(args.max_index_bytes)
        .initial_offset(args.initial_offset)
        .build();

    let log = Log::open(&args.dir, config)?;
    let outcome = execute(&log, args.command);
    let closed = log.close();

    outcome.and(closed)
}

fn execute(log: &Log, command: Commands) -> segmentlog::Result<()> {
    let mut stdout = io::stdout().lock();

    match command {
        Commands::Append { values } => {
            for value in values {
                let mut record = LogRecord::new(value);
                let offset = log.append(&mut record)?;
                writeln!(stdout, "{}", offset)?;
            }
        }
        Commands::Read { offset } => {
            let record: LogRecord = log.read(offset)?;
            writeln!(stdout, "{}", String::from_utf8_lossy(&record.value))?;
        }
        Commands::Info => {
            writeln!(stdout, "lowest offset:  {}", log.lowest_offset())?;
            writeln!(stdout, "highest offset: {}", log.highest_offset())?;
            for range in log.segment_ranges() {
                writeln!(stdout, "segment {:>12}: [{}, {})", range.start, range.start, range.end)?;
            }
        }
        Commands::Truncate { offset } => {
            log.truncate(offset)?;
            writeln!(stdout, "lowest offset: {}", log.lowest_offset())?;
        }
        Commands::Dump { out } => {
            let mut reader = log.reader();
            let copied = match out {
                Some(path) => io::copy(&mut reader, &mut File::create(path)?)?,
                None => io::copy(&mut reader, &mut stdout)?,
            };
            tracing::info!("Dumped {} bytes", copied);
        }
    }

    Ok(())
}
