use std::path::PathBuf;
use std::time::Duration;

use crate::BenchError;

/// Sentinel values substituted for measurements of a timed-out phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PenaltyPolicy {
    /// Seconds recorded for a compression or decompression that timed out.
    pub time_secs: f64,
    /// Compressed size recorded on compression timeout, as a multiple of the
    /// original size.
    pub size_factor: u64,
}

impl PenaltyPolicy {
    /// Penalty compressed size for an input of `original_size` bytes.
    pub fn size_for(&self, original_size: u64) -> u64 {
        original_size.saturating_mul(self.size_factor)
    }
}

impl Default for PenaltyPolicy {
    fn default() -> Self {
        Self {
            time_secs: 9999.0,
            size_factor: 2,
        }
    }
}

/// Runtime parameters for one benchmark run.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Trials per algorithm/level combination.
    pub iterations: usize,
    /// Upper bound on a single compression process.
    pub compress_timeout: Duration,
    /// Upper bound on a single decompression process.
    pub decompress_timeout: Duration,
    pub penalty: PenaltyPolicy,
    /// Directory receiving the per-iteration compressed/decompressed files.
    pub scratch_dir: PathBuf,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            iterations: 1,
            compress_timeout: Duration::from_secs(90),
            decompress_timeout: Duration::from_secs(30),
            penalty: PenaltyPolicy::default(),
            scratch_dir: PathBuf::from("."),
        }
    }
}

impl BenchConfig {
    /// Reject settings under which penalised rows could outrank real ones.
    pub fn validate(&self) -> Result<(), BenchError> {
        if self.iterations == 0 {
            return Err(BenchError::Config("iterations must be at least 1".into()));
        }
        if self.compress_timeout.is_zero() || self.decompress_timeout.is_zero() {
            return Err(BenchError::Config("timeouts must be non-zero".into()));
        }
        if self.penalty.size_factor < 2 {
            return Err(BenchError::Config(format!(
                "penalty size factor {} must be at least 2",
                self.penalty.size_factor
            )));
        }
        let budget = (self.compress_timeout + self.decompress_timeout).as_secs_f64();
        if !self.penalty.time_secs.is_finite() || self.penalty.time_secs <= budget {
            return Err(BenchError::Config(format!(
                "penalty time {}s must exceed the combined timeouts ({}s)",
                self.penalty.time_secs, budget
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        BenchConfig::default().validate().unwrap();
    }

    #[test]
    fn penalty_must_exceed_timeouts() {
        let mut cfg = BenchConfig::default();
        cfg.penalty.time_secs = 120.0;
        assert!(matches!(cfg.validate(), Err(BenchError::Config(_))));
        cfg.penalty.time_secs = 120.5;
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_zero_iterations_and_small_factor() {
        let cfg = BenchConfig {
            iterations: 0,
            ..BenchConfig::default()
        };
        assert!(cfg.validate().is_err());

        let mut cfg = BenchConfig::default();
        cfg.penalty.size_factor = 1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn penalty_size_doubles_input() {
        assert_eq!(PenaltyPolicy::default().size_for(1000), 2000);
    }
}
