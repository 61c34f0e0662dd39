use std::fmt;
use std::io;
use std::path::Path;

use crate::BenchError;

/// Error surfaced by the binaries before exiting with status 1.
#[derive(Debug)]
pub struct CliError {
    pub msg: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.msg.fmt(f)
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Describe a failed filesystem operation on `path` with a hint for the user.
pub fn format_io_error(operation: &str, path: &Path, err: &io::Error) -> String {
    use io::ErrorKind::*;
    let suggestion = match err.kind() {
        NotFound => "Check that the file exists or let the benchmark generate it.",
        PermissionDenied => "Check permissions on the file and its directory.",
        WriteZero => "Disk may be full. Free up space and try again.",
        Other if err.raw_os_error() == Some(28) => "Disk may be full. Free up space and try again.",
        _ => "Check the path and available disk space.",
    };
    format!("Error {} '{}': {}. {}", operation, path.display(), err, suggestion)
}

/// Wrap an I/O error on the benchmark input as a fatal input error.
pub fn input_error(operation: &str, path: &Path, err: io::Error) -> BenchError {
    BenchError::Input(format_io_error(operation, path, &err))
}

/// Wrap an I/O error on a result file as a fatal output error.
pub fn output_error(operation: &str, path: &Path, err: io::Error) -> BenchError {
    BenchError::Output(format_io_error(operation, path, &err))
}

/// Convert an I/O error into a CLI error with context.
pub fn io_cli_error(operation: &str, path: &Path, err: io::Error) -> CliError {
    CliError {
        msg: format_io_error(operation, path, &err),
        source: Some(Box::new(err)),
    }
}

/// Simple CLI error from a message.
pub fn simple_cli_error(msg: &str) -> CliError {
    CliError {
        msg: msg.to_string(),
        source: None,
    }
}

/// Convert a library error into a CLI error with a hint for the variant.
pub fn bench_cli_error(context: &str, err: BenchError) -> CliError {
    CliError {
        msg: format!("{}: {}", context, cli_hint(&err)),
        source: Some(Box::new(err)),
    }
}

/// Return an actionable hint for a benchmark error variant.
pub fn cli_hint(err: &BenchError) -> String {
    use BenchError::*;
    match err {
        Input(msg) | Output(msg) => msg.clone(),
        EmptyInput(path) => format!(
            "input file '{}' is empty. Supply a file with content.",
            path.display()
        ),
        Config(msg) => format!("{msg}. Invalid configuration."),
        Json(e) => format!("{e}. Verify the result file is intact."),
        Csv(e) => format!("{e}"),
        Io(e) => format!("{e}"),
    }
}
