//! Page-cache eviction before timed operations.

use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::process::Command;

use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to run {tool}: {source}")]
    Launch { tool: String, source: io::Error },

    #[error("{tool} exited with {status}: {stderr}")]
    Tool {
        tool: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("could not parse resident pages from {tool} output")]
    Parse { tool: String },
}

/// Evicts files from the OS page cache and reports what is still resident.
pub trait CacheControl {
    fn evict(&self, path: &Path) -> Result<(), CacheError>;
    fn resident_pages(&self, path: &Path) -> Result<u64, CacheError>;
}

/// Cache control through the `vmtouch` utility.
#[derive(Debug, Clone)]
pub struct Vmtouch {
    program: String,
}

impl Vmtouch {
    pub fn new() -> Self {
        Self::with_program("vmtouch")
    }

    pub fn with_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    fn run(&self, args: &[&OsStr]) -> Result<String, CacheError> {
        let out = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|source| CacheError::Launch {
                tool: self.program.clone(),
                source,
            })?;
        if !out.status.success() {
            return Err(CacheError::Tool {
                tool: self.program.clone(),
                status: out.status,
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

impl Default for Vmtouch {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheControl for Vmtouch {
    fn evict(&self, path: &Path) -> Result<(), CacheError> {
        self.run(&[OsStr::new("-e"), path.as_os_str()]).map(|_| ())
    }

    fn resident_pages(&self, path: &Path) -> Result<u64, CacheError> {
        let stdout = self.run(&[path.as_os_str()])?;
        parse_resident_pages(&stdout).ok_or_else(|| CacheError::Parse {
            tool: self.program.clone(),
        })
    }
}

/// Extract `N` from a `Resident Pages: N/M ...` line.
pub fn parse_resident_pages(output: &str) -> Option<u64> {
    output.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("Resident Pages:")?;
        let count = rest.trim().split('/').next()?;
        count.trim().parse().ok()
    })
}

/// Leaves the page cache alone, for hosts without `vmtouch`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCacheControl;

impl CacheControl for NoCacheControl {
    fn evict(&self, _path: &Path) -> Result<(), CacheError> {
        Ok(())
    }

    fn resident_pages(&self, _path: &Path) -> Result<u64, CacheError> {
        Ok(0)
    }
}

/// Evict `path` and confirm nothing stayed resident. Failures only warn: the
/// measurement that follows is then warmer than intended.
pub fn flush_cache(cache: &dyn CacheControl, path: &Path) -> bool {
    if let Err(e) = cache.evict(path) {
        warn!(path = %path.display(), error = %e, "cache eviction failed");
        return false;
    }
    match cache.resident_pages(path) {
        Ok(0) => {
            debug!(path = %path.display(), "cache flushed");
            true
        }
        Ok(pages) => {
            warn!(path = %path.display(), pages, "cache not flushed");
            false
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cache residency check failed");
            false
        }
    }
}
