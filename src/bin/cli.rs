//! WiscKV CLI
//!
//! Command-line interface operating directly on a local data directory.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use wisckv::{Config, Engine, WiscError};

/// WiscKV CLI
#[derive(Parser, Debug)]
#[command(name = "wisckv-cli")]
#[command(about = "CLI for the WiscKV embedded key-value store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./wisckv_data")]
    data_dir: String,

    /// Maximum key length in bytes
    #[arg(short, long, default_value = "256")]
    key_size: usize,

    /// MemTable size in KB before flush
    #[arg(short = 'm', long, default_value = "4096")]
    memtable_kb: usize,

    /// Segment count that triggers compaction
    #[arg(short, long, default_value = "8")]
    compaction_threshold: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// List keys with a prefix (all keys if omitted)
    Scan {
        /// Key prefix
        #[arg(default_value = "")]
        prefix: String,
    },

    /// Print engine counters
    Stats,

    /// Flush the memtable and merge all segments
    Compact,
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,wisckv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .key_size(args.key_size)
        .memtable_size_threshold(args.memtable_kb * 1024)
        .compaction_threshold(args.compaction_threshold)
        .build();

    let engine = match Engine::open(config) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let outcome = run(&engine, args.command);
    let closed = engine.close();

    match outcome.and_then(|code| closed.map(|_| code)) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(engine: &Engine, command: Commands) -> wisckv::Result<ExitCode> {
    match command {
        Commands::Get { key } => match engine.get(key.as_bytes()) {
            Ok(value) => {
                println!("{}", String::from_utf8_lossy(&value));
                Ok(ExitCode::SUCCESS)
            }
            Err(WiscError::KeyNotFound) => {
                eprintln!("(not found)");
                Ok(ExitCode::from(2))
            }
            Err(e) => Err(e),
        },
        Commands::Set { key, value } => {
            engine.set(key.as_bytes(), value.as_bytes())?;
            println!("OK");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Del { key } => {
            engine.delete(key.as_bytes())?;
            println!("OK");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Scan { prefix } => {
            for key in engine.scan(prefix.as_bytes())? {
                println!("{}", String::from_utf8_lossy(&key));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Stats => {
            let stats = engine.stats();
            println!("memtable_entries: {}", stats.memtable_entries);
            println!("memtable_size:    {}", stats.memtable_size);
            println!("segments:         {}", stats.segment_count);
            println!("value_log_size:   {}", stats.value_log_size);
            println!("wal_size:         {}", stats.wal_size);
            println!("next_lsn:         {}", stats.next_lsn);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Compact => {
            engine.flush()?;
            engine.compact()?;
            println!("OK ({} segments)", engine.segment_count());
            Ok(ExitCode::SUCCESS)
        }
    }
}
