//! Run-relative scoring.
//!
//! Scores compare each result to the best one measured in the same run, so
//! the same algorithm and level may score differently against a different
//! set of competitors. Raw ratios and times are floored at the smallest
//! positive `f64` before dividing so every score stays finite and positive.

use crate::aggregate::AggregatedResult;

/// Best values observed across one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBounds {
    /// Largest `1 / ratio`, i.e. the best compression.
    pub best_inverse_ratio: f64,
    /// Smallest compression + decompression time.
    pub fastest_total_time: f64,
}

impl ScoreBounds {
    pub fn from_results(results: &[AggregatedResult]) -> Option<Self> {
        if results.is_empty() {
            return None;
        }
        let best_inverse_ratio = results
            .iter()
            .map(inverse_ratio)
            .fold(f64::MIN_POSITIVE, f64::max);
        let fastest_total_time = results
            .iter()
            .map(floored_total_time)
            .fold(f64::INFINITY, f64::min);
        Some(Self {
            best_inverse_ratio,
            fastest_total_time,
        })
    }

    pub fn compression_score(&self, result: &AggregatedResult) -> f64 {
        inverse_ratio(result) / self.best_inverse_ratio
    }

    pub fn speed_score(&self, result: &AggregatedResult) -> f64 {
        self.fastest_total_time / floored_total_time(result)
    }
}

fn inverse_ratio(result: &AggregatedResult) -> f64 {
    1.0 / result.avg_compression_ratio.max(f64::MIN_POSITIVE)
}

fn floored_total_time(result: &AggregatedResult) -> f64 {
    result.total_time().max(f64::MIN_POSITIVE)
}

/// Attach compression, speed and trade-off scores to every result in place.
pub fn score_results(results: &mut [AggregatedResult]) {
    let Some(bounds) = ScoreBounds::from_results(results) else {
        return;
    };
    for r in results.iter_mut() {
        r.compression_score = bounds.compression_score(r);
        r.speed_score = bounds.speed_score(r);
        r.trade_off_score = (r.compression_score + r.speed_score) / 2.0 * 100.0;
    }
}
