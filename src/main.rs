#![deny(unsafe_code)]

//! Command-line front end for the xisort sorter.
//!
//! Reads a raw file of packed little-endian IEEE-754 binary64 values, sorts
//! it under the total order, and writes the result. Exits 0 on success;
//! any fatal error prints a single `[xisort]`-prefixed diagnostic on stderr
//! and exits non-zero, leaving no partial output behind.

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;
use std::path::PathBuf;

use xisort_lib::logging::{format_count, OperationTimer};
use xisort_lib::sort::{XiSorter, DEFAULT_BUFFER_ELEMS};

/// Sort a raw binary file of IEEE-754 doubles under the total order.
#[derive(Parser, Debug)]
#[command(
    name = "xisort",
    version,
    about = "Sort raw little-endian binary64 files under the IEEE-754 total order",
    long_about = r#"
Sort a raw binary file of tightly packed little-endian IEEE-754 binary64
values. The output is ordered by the IEEE-754-2019 total order:

  -NaN < -Inf < negative finites < -0 < +0 < positive finites < +Inf < +NaN

with NaN payloads ordered by bit pattern and every input bit pattern
preserved exactly. Inputs within the memory budget are sorted in memory;
larger inputs (or --external) use a disk-backed pipeline of sorted runs
merged through a min-heap, with multi-pass merging when the run count
exceeds the memory-bounded fan-in cap.

EXAMPLES:

  # Sort a file that fits in memory, in parallel
  xisort --parallel input.bin sorted.bin

  # Bounded-memory external sort with 64 MiB resident
  xisort --external --mem-limit 64M input.bin sorted.bin

  # Keep scratch runs on a fast disk
  xisort --external --scratch-dir /mnt/ssd/tmp input.bin sorted.bin
"#
)]
struct Args {
    /// Force the external (disk-backed) merge-sort path.
    #[arg(long)]
    external: bool,

    /// Permit task-parallel in-memory sorting.
    #[arg(long)]
    parallel: bool,

    /// Accumulate and report the phi merge-segment diagnostic.
    #[arg(long)]
    trace: bool,

    /// Maximum bytes kept resident.
    ///
    /// Accepts a decimal byte count, optionally suffixed with K, M, or G.
    /// Bounds run size and merge fan-in in external mode.
    #[arg(long = "mem-limit", default_value = "1G", value_parser = parse_memory)]
    mem_limit: u64,

    /// Per-run and output buffer size in doubles for external mode.
    #[arg(long = "buffer-elems", default_value_t = DEFAULT_BUFFER_ELEMS)]
    buffer_elems: usize,

    /// Directory for scratch run files.
    ///
    /// Defaults to the current directory. Concurrent sorts must use
    /// distinct scratch directories.
    #[arg(long = "scratch-dir")]
    scratch_dir: Option<PathBuf>,

    /// Input file of packed little-endian binary64 values.
    input: PathBuf,

    /// Output file path.
    output: PathBuf,
}

/// Parse a memory size string (e.g., "1073741824", "512M", "1G").
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_memory(s: &str) -> Result<u64, String> {
    let s = s.trim().to_uppercase();

    if s.is_empty() {
        return Err("Empty memory specification".to_string());
    }

    let (num_str, multiplier) = if s.ends_with('G') {
        (&s[..s.len() - 1], 1024 * 1024 * 1024)
    } else if s.ends_with('M') {
        (&s[..s.len() - 1], 1024 * 1024)
    } else if s.ends_with('K') {
        (&s[..s.len() - 1], 1024)
    } else {
        // Assume bytes
        (s.as_str(), 1)
    };

    let num: f64 = num_str.parse().map_err(|_| format!("Invalid number: {num_str}"))?;

    if num < 0.0 {
        return Err("Memory size must be positive".to_string());
    }

    Ok((num * multiplier as f64) as u64)
}

fn run(args: &Args) -> Result<()> {
    let timer = OperationTimer::new("Sorting");

    info!("Input: {}", args.input.display());
    info!("Output: {}", args.output.display());
    info!("Memory limit: {} bytes", args.mem_limit);
    if args.external {
        info!("External mode: forced");
    }
    if args.parallel {
        info!("Parallel: enabled");
    }
    if let Some(ref dir) = args.scratch_dir {
        info!("Scratch directory: {}", dir.display());
    }

    let mut sorter = XiSorter::new()
        .external(args.external)
        .parallel(args.parallel)
        .trace(args.trace)
        .memory_limit(args.mem_limit)
        .buffer_elems(args.buffer_elems);
    if let Some(ref dir) = args.scratch_dir {
        sorter = sorter.scratch_dir(dir.clone());
    }

    let stats = sorter
        .sort_file(&args.input, &args.output)
        .with_context(|| format!("sorting {}", args.input.display()))?;

    info!("=== Summary ===");
    info!("Values sorted: {}", format_count(stats.elements));
    if stats.runs_written > 0 {
        info!("Runs written: {}", stats.runs_written);
        info!("Merge passes: {}", stats.merge_passes);
    }
    if let Some(phi) = stats.phi {
        info!("Phi: {phi:.6} over {} segments", format_count(stats.segments));
    }
    info!("Output: {}", args.output.display());

    timer.log_completion(stats.elements);
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("[xisort] {e:#}");
        std::process::exit(1);
    }
}
