use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use coldbench::{
    algorithm::select_algorithms,
    generate::{generate_input, DEFAULT_INPUT_SIZE},
    io_utils::{bench_cli_error, io_cli_error, simple_cli_error, CliError},
    combination_count, default_algorithms, load_algorithms, run_benchmark, run_timestamp,
    write_results, BenchConfig, CacheControl, NoCacheControl, PenaltyPolicy, Sha256Digester,
    Vmtouch,
};
use indicatif::{ProgressBar, ProgressStyle};
use sysinfo::{System, SystemExt};
use tracing::{info, Level};

/// Benchmark external compression tools on one file with a cold page cache.
#[derive(Parser)]
#[command(name = "coldbench")]
struct Args {
    /// Input file; generated when missing unless --no-generate is given
    #[arg(long, default_value = "teuthology.log")]
    input: PathBuf,
    /// Size in bytes of a generated input file
    #[arg(long, default_value_t = DEFAULT_INPUT_SIZE)]
    input_size: u64,
    /// Fail instead of generating a missing input file
    #[arg(long)]
    no_generate: bool,
    /// Directory receiving results_<timestamp>.json and .csv
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
    /// Directory for per-iteration compressed/decompressed files
    #[arg(long, default_value = ".")]
    scratch_dir: PathBuf,
    /// Iterations per algorithm and level
    #[arg(long, default_value_t = 1)]
    iterations: usize,
    /// Compression time limit in seconds
    #[arg(long, default_value_t = 90.0)]
    compress_timeout: f64,
    /// Decompression time limit in seconds
    #[arg(long, default_value_t = 30.0)]
    decompress_timeout: f64,
    /// Seconds recorded for a timed-out phase
    #[arg(long, default_value_t = 9999.0)]
    penalty_time: f64,
    /// Compressed size recorded on compression timeout, in multiples of the input size
    #[arg(long, default_value_t = 2)]
    penalty_size_factor: u64,
    /// JSON file with the algorithm table (defaults to the built-in table)
    #[arg(long)]
    algorithms: Option<PathBuf>,
    /// Comma separated algorithm names to run
    #[arg(long, value_delimiter = ',')]
    only: Vec<String>,
    /// Skip vmtouch page-cache eviction
    #[arg(long)]
    no_cache_flush: bool,
    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = BenchConfig {
        iterations: args.iterations,
        compress_timeout: seconds("--compress-timeout", args.compress_timeout)?,
        decompress_timeout: seconds("--decompress-timeout", args.decompress_timeout)?,
        penalty: PenaltyPolicy {
            time_secs: args.penalty_time,
            size_factor: args.penalty_size_factor,
        },
        scratch_dir: args.scratch_dir.clone(),
    };

    let specs = match &args.algorithms {
        Some(path) => load_algorithms(path),
        None => Ok(default_algorithms()),
    }
    .and_then(|specs| select_algorithms(specs, &args.only))
    .map_err(|e| bench_cli_error("loading algorithms", e))?;

    if !args.no_generate && !args.input.exists() {
        info!(path = %args.input.display(), bytes = args.input_size, "creating test file");
        generate_input(&args.input, args.input_size, &mut rand::thread_rng())
            .map_err(|e| io_cli_error("generating input file", &args.input, e))?;
    }

    log_host();
    let cache: Box<dyn CacheControl> = if args.no_cache_flush {
        Box::new(NoCacheControl)
    } else {
        Box::new(Vmtouch::new())
    };

    info!(input = %args.input.display(), algorithms = specs.len(), "starting benchmark");
    let progress = ProgressBar::new(combination_count(&specs));
    if let Ok(style) = ProgressStyle::with_template("{elapsed_precise} [{bar:30}] {pos}/{len} {msg}") {
        progress.set_style(style);
    }
    let results = run_benchmark(
        &config,
        cache.as_ref(),
        &Sha256Digester,
        &args.input,
        &specs,
        &progress,
    )
    .map_err(|e| bench_cli_error("benchmark failed", e))?;
    progress.finish_and_clear();

    fs::create_dir_all(&args.output_dir)
        .map_err(|e| io_cli_error("creating output directory", &args.output_dir, e))?;
    let paths = write_results(&args.output_dir, run_timestamp(), &results)
        .map_err(|e| bench_cli_error("saving results", e))?;

    println!("Results saved:");
    println!("JSON: {}", paths.json.display());
    println!("CSV: {}", paths.csv.display());
    println!("Total tests: {}", results.len());
    Ok(())
}

fn seconds(flag: &str, value: f64) -> Result<Duration, CliError> {
    Duration::try_from_secs_f64(value)
        .map_err(|_| simple_cli_error(&format!("{flag} must be a non-negative number of seconds")))
}

fn log_host() {
    let mut sys = System::new();
    sys.refresh_cpu();
    sys.refresh_memory();
    info!(
        cpus = sys.cpus().len(),
        physical_cores = sys.physical_core_count().unwrap_or(0),
        memory_bytes = sys.total_memory(),
        "host"
    );
}
