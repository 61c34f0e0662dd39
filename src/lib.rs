//! Cold-cache benchmark of external compression tools.
//!
//! Each configured tool is run at three levels against one input file. The
//! page cache is flushed before every timed step, round trips are checked by
//! SHA-256, slow tools receive penalty values instead of disappearing, and
//! the aggregated rows are scored relative to the best of the run.

pub mod aggregate;
pub mod algorithm;
pub mod cache;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod generate;
pub mod io_utils;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod runner;
pub mod score;
pub mod verify;

use std::path::Path;

use indicatif::ProgressBar;

pub use aggregate::{aggregate, AggregatedResult, IterationMeasurement, PartialMeasurement};
pub use algorithm::{default_algorithms, load_algorithms, AlgorithmSpec, LevelName, Levels};
pub use cache::{flush_cache, CacheControl, CacheError, NoCacheControl, Vmtouch};
pub use cleanup::remove_result_files;
pub use config::{BenchConfig, PenaltyPolicy};
pub use error::BenchError;
pub use output::{read_results, run_timestamp, write_results, OutputPaths};
pub use pipeline::{combination_count, Pipeline};
pub use report::render_report;
pub use runner::{run_timed, RunError, TimedRun};
pub use score::{score_results, ScoreBounds};
pub use verify::{Digester, Sha256Digester};

/// Measure, aggregate and score `specs` against `input`.
pub fn run_benchmark(
    config: &BenchConfig,
    cache: &dyn CacheControl,
    digester: &dyn Digester,
    input: &Path,
    specs: &[AlgorithmSpec],
    progress: &ProgressBar,
) -> Result<Vec<AggregatedResult>, BenchError> {
    algorithm::validate_algorithms(specs)?;
    let pipeline = Pipeline::new(config, cache, digester, input)?;
    tracing::info!(
        input = %pipeline.input().display(),
        bytes = pipeline.original_size(),
        "input ready"
    );
    let mut results = pipeline.run(specs, progress);
    score_results(&mut results);
    Ok(results)
}
