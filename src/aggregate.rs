//! Per-iteration measurements and their reduction to one row per
//! algorithm/level combination.

use serde::{Deserialize, Serialize};

use crate::algorithm::{AlgorithmSpec, LevelName};

/// One compress + decompress trial, possibly carrying penalty values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationMeasurement {
    pub compression_time: f64,
    pub decompression_time: f64,
    pub compressed_size: u64,
    pub integrity_valid: bool,
}

/// Fields of an iteration filled in as its phases complete.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PartialMeasurement {
    pub compression_time: Option<f64>,
    pub decompression_time: Option<f64>,
    pub compressed_size: Option<u64>,
    pub integrity_valid: bool,
}

impl PartialMeasurement {
    /// A complete measurement if every numeric field is set. Zero is a valid
    /// value.
    pub fn finish(self) -> Option<IterationMeasurement> {
        Some(IterationMeasurement {
            compression_time: self.compression_time?,
            decompression_time: self.decompression_time?,
            compressed_size: self.compressed_size?,
            integrity_valid: self.integrity_valid,
        })
    }
}

/// Averaged result for one algorithm at one level. Field order is the
/// persisted column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub algorithm: String,
    pub is_threaded: bool,
    pub level_name: LevelName,
    pub level_value: u32,
    pub iterations: usize,
    pub original_size: u64,
    pub avg_compressed_size: f64,
    pub avg_compression_ratio: f64,
    pub avg_compression_time: f64,
    pub avg_decompression_time: f64,
    pub all_sha256_valid: bool,
    #[serde(default)]
    pub compression_score: f64,
    #[serde(default)]
    pub speed_score: f64,
    #[serde(default)]
    pub trade_off_score: f64,
}

impl AggregatedResult {
    /// Persisted keys, in serialization order.
    pub const FIELDS: [&'static str; 14] = [
        "algorithm",
        "is_threaded",
        "level_name",
        "level_value",
        "iterations",
        "original_size",
        "avg_compressed_size",
        "avg_compression_ratio",
        "avg_compression_time",
        "avg_decompression_time",
        "all_sha256_valid",
        "compression_score",
        "speed_score",
        "trade_off_score",
    ];

    pub fn total_time(&self) -> f64 {
        self.avg_compression_time + self.avg_decompression_time
    }
}

/// Reduce the iterations of one combination. `None` when no iteration
/// produced a measurement.
pub fn aggregate(
    spec: &AlgorithmSpec,
    level_name: LevelName,
    level_value: u32,
    original_size: u64,
    measurements: &[IterationMeasurement],
) -> Option<AggregatedResult> {
    if measurements.is_empty() {
        return None;
    }
    let n = measurements.len() as f64;
    let mean = |f: fn(&IterationMeasurement) -> f64| measurements.iter().map(f).sum::<f64>() / n;

    let avg_compressed_size = mean(|m| m.compressed_size as f64);
    Some(AggregatedResult {
        algorithm: spec.name.clone(),
        is_threaded: spec.is_threaded,
        level_name,
        level_value,
        iterations: measurements.len(),
        original_size,
        avg_compressed_size,
        avg_compression_ratio: avg_compressed_size / original_size as f64,
        avg_compression_time: mean(|m| m.compression_time),
        avg_decompression_time: mean(|m| m.decompression_time),
        all_sha256_valid: measurements.iter().all(|m| m.integrity_valid),
        compression_score: 0.0,
        speed_score: 0.0,
        trade_off_score: 0.0,
    })
}
