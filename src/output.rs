use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::aggregate::AggregatedResult;
use crate::io_utils::output_error;
use crate::BenchError;

/// Prefix shared by every persisted result file.
pub const RESULTS_PREFIX: &str = "results_";

/// Locations of one run's persisted results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub json: PathBuf,
    pub csv: PathBuf,
}

impl OutputPaths {
    pub fn for_timestamp(dir: &Path, timestamp: u64) -> Self {
        Self {
            json: dir.join(format!("{RESULTS_PREFIX}{timestamp}.json")),
            csv: dir.join(format!("{RESULTS_PREFIX}{timestamp}.csv")),
        }
    }
}

/// Seconds since the Unix epoch, used to name a run's files.
pub fn run_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Write `results` as a pretty JSON array and as CSV under one timestamp.
pub fn write_results(
    dir: &Path,
    timestamp: u64,
    results: &[AggregatedResult],
) -> Result<OutputPaths, BenchError> {
    let paths = OutputPaths::for_timestamp(dir, timestamp);
    write_json(&paths.json, results)?;
    write_csv(&paths.csv, results)?;
    Ok(paths)
}

pub fn write_json(path: &Path, results: &[AggregatedResult]) -> Result<(), BenchError> {
    let file = File::create(path).map_err(|e| output_error("creating json", path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, results)?;
    writer
        .write_all(b"\n")
        .and_then(|_| writer.flush())
        .map_err(|e| output_error("writing json", path, e))
}

/// The header row is written even when there are no results.
pub fn write_csv(path: &Path, results: &[AggregatedResult]) -> Result<(), BenchError> {
    let file = File::create(path).map_err(|e| output_error("creating csv", path, e))?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    wtr.write_record(AggregatedResult::FIELDS)?;
    for r in results {
        wtr.serialize(r)?;
    }
    wtr.flush().map_err(|e| output_error("writing csv", path, e))
}

/// Load a JSON result array written by [`write_json`].
pub fn read_results(path: &Path) -> Result<Vec<AggregatedResult>, BenchError> {
    let file = File::open(path).map_err(|e| crate::io_utils::input_error("opening results", path, e))?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}
