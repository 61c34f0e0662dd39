//! Measurement pipeline.
//!
//! Every (algorithm, level, iteration) is one [`Trial`] walking
//! `Idle → FlushingPreCompress → Compressing → FlushingPreDecompress →
//! Decompressing → Verifying → Cleanup → Done`. A failed or timed-out
//! process jumps straight to `Cleanup`. Timeouts fill the still-missing
//! fields with penalty values so the combination stays rankable; process
//! failures drop the iteration.

use std::cell::OnceCell;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use tracing::{debug, info, info_span, warn};

use crate::aggregate::{aggregate, AggregatedResult, IterationMeasurement, PartialMeasurement};
use crate::algorithm::{check_scratch_names, AlgorithmSpec, LevelName};
use crate::cache::{flush_cache, CacheControl};
use crate::config::{BenchConfig, PenaltyPolicy};
use crate::io_utils::{format_io_error, input_error};
use crate::runner::{run_timed, RunError};
use crate::verify::{matches_digest, Digester};
use crate::BenchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    FlushingPreCompress,
    Compressing,
    FlushingPreDecompress,
    Decompressing,
    Verifying,
    Cleanup,
    Done,
}

/// Scratch files of one iteration, removed when dropped.
#[derive(Debug)]
pub struct ScratchFiles {
    pub compressed: PathBuf,
    pub decompressed: PathBuf,
}

impl ScratchFiles {
    /// Paths inside `dir`. Fails for names that would escape it.
    pub fn new(
        dir: &Path,
        spec: &AlgorithmSpec,
        level: LevelName,
        iteration: usize,
    ) -> Result<Self, BenchError> {
        check_scratch_names(spec)?;
        let stem = format!("{}_{}_iter{}", spec.name, level, iteration);
        Ok(Self {
            compressed: dir.join(format!("{stem}_compressed{}", spec.extension)),
            decompressed: dir.join(format!("{stem}_decompressed.log")),
        })
    }

    pub fn remove(&self) {
        for path in [&self.compressed, &self.decompressed] {
            match fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "removed scratch file"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "could not remove scratch file"),
            }
        }
    }
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        self.remove();
    }
}

/// Fill every field a timed-out phase left unset with its penalty value.
pub fn apply_penalty(partial: &mut PartialMeasurement, penalty: &PenaltyPolicy, original_size: u64) {
    partial.compression_time.get_or_insert(penalty.time_secs);
    partial.decompression_time.get_or_insert(penalty.time_secs);
    partial
        .compressed_size
        .get_or_insert(penalty.size_for(original_size));
    partial.integrity_valid = false;
}

/// Drives external tools over one input file.
pub struct Pipeline<'a> {
    config: &'a BenchConfig,
    cache: &'a dyn CacheControl,
    digester: &'a dyn Digester,
    input: PathBuf,
    original_size: u64,
    original_digest: OnceCell<String>,
}

impl<'a> Pipeline<'a> {
    /// Check the configuration and the input file. An unreadable, missing or
    /// empty input is fatal.
    pub fn new(
        config: &'a BenchConfig,
        cache: &'a dyn CacheControl,
        digester: &'a dyn Digester,
        input: &Path,
    ) -> Result<Self, BenchError> {
        config.validate()?;
        let meta = fs::metadata(input).map_err(|e| input_error("reading input file", input, e))?;
        if !meta.is_file() {
            return Err(BenchError::Input(format!(
                "'{}' is not a regular file",
                input.display()
            )));
        }
        File::open(input).map_err(|e| input_error("opening input file", input, e))?;
        if meta.len() == 0 {
            return Err(BenchError::EmptyInput(input.to_path_buf()));
        }
        fs::create_dir_all(&config.scratch_dir).map_err(|e| {
            BenchError::Output(format_io_error(
                "creating scratch directory",
                &config.scratch_dir,
                &e,
            ))
        })?;
        Ok(Self {
            config,
            cache,
            digester,
            input: input.to_path_buf(),
            original_size: meta.len(),
            original_digest: OnceCell::new(),
        })
    }

    pub fn original_size(&self) -> u64 {
        self.original_size
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    /// Run every level of every algorithm in table order. Combinations
    /// without a single usable iteration are left out.
    pub fn run(&self, specs: &[AlgorithmSpec], progress: &ProgressBar) -> Vec<AggregatedResult> {
        let mut results = Vec::new();
        for spec in specs {
            info!(
                algorithm = %spec.name,
                threaded = spec.is_threaded,
                "testing algorithm"
            );
            for (level_name, level_value) in spec.levels.iter() {
                progress.set_message(format!("{} {}", spec.name, level_name));
                if let Some(result) = self.run_combination(spec, level_name, level_value) {
                    results.push(result);
                }
                progress.inc(1);
            }
        }
        results
    }

    pub fn run_combination(
        &self,
        spec: &AlgorithmSpec,
        level_name: LevelName,
        level_value: u32,
    ) -> Option<AggregatedResult> {
        let iterations = self.config.iterations;
        let measurements: Vec<IterationMeasurement> = (0..iterations)
            .filter_map(|i| {
                info!(algorithm = %spec.name, level = %level_name, "iteration {}/{}", i + 1, iterations);
                self.measure_iteration(spec, level_name, level_value, i)
            })
            .collect();

        let result = aggregate(
            spec,
            level_name,
            level_value,
            self.original_size,
            &measurements,
        );
        if result.is_none() {
            debug!(algorithm = %spec.name, level = %level_name, "no usable iterations, combination omitted");
        }
        result
    }

    /// One compress/decompress trial. `None` when the iteration was abandoned
    /// before a full (possibly penalised) measurement existed.
    pub fn measure_iteration(
        &self,
        spec: &AlgorithmSpec,
        level_name: LevelName,
        level_value: u32,
        iteration: usize,
    ) -> Option<IterationMeasurement> {
        let span = info_span!(
            "iteration",
            algorithm = %spec.name,
            level = %level_name,
            iteration
        );
        let _enter = span.enter();

        let scratch = match ScratchFiles::new(&self.config.scratch_dir, spec, level_name, iteration) {
            Ok(scratch) => scratch,
            Err(e) => {
                warn!(error = %e, "iteration abandoned");
                return None;
            }
        };
        let mut trial = Trial {
            pipeline: self,
            spec,
            level_value,
            scratch,
            partial: PartialMeasurement::default(),
            abandoned: false,
        };
        let mut phase = Phase::Idle;
        while phase != Phase::Done {
            phase = trial.step(phase);
        }
        trial.finish()
    }

    /// Digest of the input, computed on first success. A failure is not
    /// remembered so later iterations retry.
    fn original_digest(&self) -> Option<&str> {
        if let Some(d) = self.original_digest.get() {
            return Some(d.as_str());
        }
        match self.digester.digest(&self.input) {
            Ok(d) => Some(self.original_digest.get_or_init(|| d).as_str()),
            Err(e) => {
                warn!(path = %self.input.display(), error = %e, "digest of input failed");
                None
            }
        }
    }
}

struct Trial<'p, 'a> {
    pipeline: &'p Pipeline<'a>,
    spec: &'p AlgorithmSpec,
    level_value: u32,
    scratch: ScratchFiles,
    partial: PartialMeasurement,
    /// Set on process or infrastructure failure: the iteration is dropped.
    abandoned: bool,
}

impl Trial<'_, '_> {
    fn step(&mut self, phase: Phase) -> Phase {
        let config = self.pipeline.config;
        match phase {
            Phase::Idle => Phase::FlushingPreCompress,
            Phase::FlushingPreCompress => {
                flush_cache(self.pipeline.cache, &self.pipeline.input);
                Phase::Compressing
            }
            Phase::Compressing => {
                let argv = match self.spec.compress_argv(self.level_value) {
                    Ok(argv) => argv,
                    Err(e) => return self.abandon("compression", &e),
                };
                match run_timed(
                    &argv,
                    &self.pipeline.input,
                    &self.scratch.compressed,
                    config.compress_timeout,
                ) {
                    Ok(run) => {
                        info!(
                            seconds = run.elapsed.as_secs_f64(),
                            size = run.output_size,
                            "compressed"
                        );
                        self.partial.compression_time = Some(run.elapsed.as_secs_f64());
                        self.partial.compressed_size = Some(run.output_size);
                        Phase::FlushingPreDecompress
                    }
                    Err(e) => self.on_failure("compression", e),
                }
            }
            Phase::FlushingPreDecompress => {
                flush_cache(self.pipeline.cache, &self.scratch.compressed);
                Phase::Decompressing
            }
            Phase::Decompressing => {
                let argv = match self.spec.decompress_argv(self.level_value) {
                    Ok(argv) => argv,
                    Err(e) => return self.abandon("decompression", &e),
                };
                match run_timed(
                    &argv,
                    &self.scratch.compressed,
                    &self.scratch.decompressed,
                    config.decompress_timeout,
                ) {
                    Ok(run) => {
                        info!(seconds = run.elapsed.as_secs_f64(), "decompressed");
                        self.partial.decompression_time = Some(run.elapsed.as_secs_f64());
                        Phase::Verifying
                    }
                    Err(e) => self.on_failure("decompression", e),
                }
            }
            Phase::Verifying => {
                self.partial.integrity_valid = match self.pipeline.original_digest() {
                    Some(expected) => matches_digest(
                        self.pipeline.digester,
                        expected,
                        &self.scratch.decompressed,
                    ),
                    None => false,
                };
                if self.partial.integrity_valid {
                    info!("verification passed");
                } else {
                    warn!("verification failed");
                }
                Phase::Cleanup
            }
            Phase::Cleanup => {
                self.scratch.remove();
                Phase::Done
            }
            Phase::Done => Phase::Done,
        }
    }

    fn on_failure(&mut self, stage: &str, err: RunError) -> Phase {
        if err.is_timeout() {
            warn!(stage, error = %err, "timeout, assigning penalty");
            apply_penalty(
                &mut self.partial,
                &self.pipeline.config.penalty,
                self.pipeline.original_size,
            );
            Phase::Cleanup
        } else {
            self.abandon(stage, &err)
        }
    }

    fn abandon(&mut self, stage: &str, err: &dyn std::error::Error) -> Phase {
        warn!(stage, error = %err, "iteration abandoned");
        self.abandoned = true;
        Phase::Cleanup
    }

    fn finish(self) -> Option<IterationMeasurement> {
        if self.abandoned {
            return None;
        }
        self.partial.finish()
    }
}

/// Number of progress steps [`Pipeline::run`] takes for `specs`.
pub fn combination_count(specs: &[AlgorithmSpec]) -> u64 {
    (specs.len() * LevelName::ALL.len()) as u64
}
