use std::path::PathBuf;

use thiserror::Error;

/// Conditions that abort a whole benchmark run.
///
/// Everything that goes wrong inside a single iteration is absorbed into the
/// result data instead; see [`crate::pipeline`].
#[derive(Error, Debug)]
pub enum BenchError {
    /// The input file could not be opened or inspected.
    #[error("input error: {0}")]
    Input(String),

    /// The input file exists but holds no bytes, so no ratio can be formed.
    #[error("input file '{}' is empty", .0.display())]
    EmptyInput(PathBuf),

    /// Invalid run configuration or algorithm table.
    #[error("config error: {0}")]
    Config(String),

    /// Persisting results failed.
    #[error("output error: {0}")]
    Output(String),

    /// JSON encoding or decoding of a result file.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV encoding of a result file.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Propagated I/O error without extra context.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
