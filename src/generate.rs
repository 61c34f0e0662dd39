//! Synthetic log input for hosts without a real corpus.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use rand::Rng;

/// Default size of a generated input, 300 MiB.
pub const DEFAULT_INPUT_SIZE: u64 = 300 * 1024 * 1024;

/// One random log line.
pub fn log_line<R: Rng>(rng: &mut R) -> String {
    match rng.gen_range(0..5) {
        0 => format!(
            "2025-08-15 10:30:45 INFO: Starting teuthology job {}\n",
            rng.gen_range(10000..=99999)
        ),
        1 => format!(
            "2025-08-15 10:30:46 DEBUG: Connecting to cluster nodes {}\n",
            rng.gen_range(10000..=99999)
        ),
        2 => format!(
            "2025-08-15 10:30:47 ERROR: Connection timeout on node-{}\n",
            rng.gen_range(1..=10)
        ),
        3 => format!(
            "2025-08-15 10:30:48 WARN: Retrying connection to node-{}\n",
            rng.gen_range(1..=10)
        ),
        _ => "2025-08-15 10:30:49 INFO: Successfully connected to all nodes\n".to_string(),
    }
}

/// Write random log lines to `path` until at least `size` bytes exist.
/// Returns `Ok(false)` without touching an existing file.
pub fn generate_input<R: Rng>(path: &Path, size: u64, rng: &mut R) -> io::Result<bool> {
    let file: File = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(e),
    };
    let mut writer = BufWriter::new(file);
    let mut written = 0u64;
    while written < size {
        let line = log_line(rng);
        writer.write_all(line.as_bytes())?;
        written += line.len() as u64;
    }
    writer.flush()?;
    Ok(true)
}
