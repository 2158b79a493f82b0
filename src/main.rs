//! diskcache-gc CLI
//!
//! Entry point for the `diskcache-gc` command-line tool. Runs one collection
//! over a disk cache and prints what it did.
//!
//! Exit codes: 0 clean run, 1 configuration error, 2 some entries could not
//! be deleted.

use clap::Parser;
use diskcache_gc::config::format_size;
use diskcache_gc::{build_collector, logging, CliOverrides, CollectionOutcome, GcConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

#[derive(Parser)]
#[command(name = "diskcache-gc")]
#[command(about = "Garbage-collect an on-disk build cache by size and/or age", version)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Cache root containing ac/, cas/, tmp/ and gc/
    #[arg(long)]
    disk_cache: Option<PathBuf>,

    /// Keep at most this many bytes (e.g. 10GiB, 500M, 4096)
    #[arg(long)]
    max_size: Option<String>,

    /// Delete entries at least this old (e.g. 14d, 12h, 3600)
    #[arg(long)]
    max_age: Option<String>,

    /// Worker threads for scanning and deleting
    #[arg(long, short = 'j')]
    jobs: Option<usize>,

    /// Report what would be deleted without deleting
    #[arg(long)]
    dry_run: bool,

    /// Output in JSON format
    #[arg(long)]
    json: bool,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let mut config = match cli.config {
        Some(ref path) => match GcConfig::from_file(path) {
            Ok(c) => {
                debug!("loaded config from {}", path.display());
                c
            }
            Err(e) => {
                eprintln!("Error loading config {}: {}", path.display(), e);
                return ExitCode::from(1);
            }
        },
        None => GcConfig::default(),
    };

    config.apply(CliOverrides {
        cache_root: cli.disk_cache,
        max_size: cli.max_size,
        max_age: cli.max_age,
        jobs: cli.jobs,
        dry_run: cli.dry_run,
    });

    let collector = match config.resolve().and_then(|resolved| build_collector(&resolved)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::from(1);
        }
    };

    let outcome = match collector.run() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::from(1);
        }
    };

    if cli.json {
        match serde_json::to_string_pretty(&outcome) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                return ExitCode::from(1);
            }
        }
    } else {
        print_human(&outcome);
    }

    if outcome.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    }
}

fn print_human(outcome: &CollectionOutcome) {
    let verb = if outcome.dry_run { "Would evict" } else { "Evicted" };

    println!(
        "Scanned:   {} entries ({})",
        outcome.scanned_entries,
        format_size(outcome.scanned_bytes)
    );
    println!(
        "{}: {} entries ({})",
        verb,
        outcome.evicted_entries,
        format_size(outcome.evicted_bytes)
    );
    println!("Remaining: {}", format_size(outcome.remaining_bytes()));
    if outcome.refreshed_entries > 0 {
        println!("Kept {} entries touched during the run", outcome.refreshed_entries);
    }
    if !outcome.failures.is_empty() {
        println!();
        println!("Failed to delete {} entries:", outcome.failures.len());
        for failure in &outcome.failures {
            println!("  {}: {}", failure.path.display(), failure.reason);
        }
    }
    println!(
        "Duration:  {} ms",
        (outcome.finished_at - outcome.started_at).num_milliseconds()
    );
}
